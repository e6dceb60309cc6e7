//! stubfix core library: line-indexed, tree-guided codemods for Python stub
//! files.
//!
//! A file is parsed with tree-sitter, read-only matchers decide which edits
//! are needed and record them in a [`PatchLedger`] against the original
//! lines, the ledger is applied, and the result is reparsed before a narrower
//! fix-up pass runs on the new tree. The [`pipeline`] module drives that per
//! file and folds the outcomes into a [`Session`].

pub mod codemods;
pub mod config;
pub mod errors;
pub mod matchers;
pub mod models;
pub mod patch;
pub mod pipeline;
pub mod syntax;

pub use codemods::{Codemod, CodemodContext, CodemodKind, Plan};
pub use config::{ProjectConfig, RunSettings, TypeshedConfig};
pub use errors::{StubfixError, StubfixResult};
pub use models::{Diagnostic, DiagnosticKind, FileReport, FileState};
pub use patch::{apply, PatchLedger};
pub use pipeline::{check, migrate, migrate_source, RunOptions, Session};
pub use syntax::SourceFile;
