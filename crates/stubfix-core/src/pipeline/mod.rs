//! Orchestration: file enumeration, the per-file pipeline, external tools
//! and the validation gate.

pub mod external;
pub mod filesystem;
pub mod gate;
pub mod run;
pub mod session;

pub use run::{migrate_source, process_file, run_pass, Migration, PassOutcome};
pub use session::{check, migrate, RunOptions, Session};
