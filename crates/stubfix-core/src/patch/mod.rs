//! Patch ledger and applier.

pub mod apply;
pub mod ledger;

pub use apply::{apply, find_token_aligned};
pub use ledger::{InsertionRecord, PatchLedger, PatchRecord, Scope};
