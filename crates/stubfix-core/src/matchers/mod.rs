//! Read-only visitors over a parsed stub. Rewriting matchers return a
//! [`PatchLedger`](crate::patch::PatchLedger); checking matchers return
//! diagnostics.

pub mod aliases;
pub mod imports;
pub mod self_params;
pub mod subscripts;
pub mod type_ignores;
pub mod unions;
pub mod version_checks;

pub use aliases::{alias_rewrites, find_alias_candidates, CandidateAssignment, SUPPRESSION_MARKER};
pub use imports::{
    collect_imports, import_anchor, imported_bindings, imports_name, prune_imports, ImportStatement,
    NameAction, PruneOutcome, PruneRules,
};
pub use self_params::strip_self_annotations;
pub use subscripts::lower_subscripts;
pub use type_ignores::strip_ignore_codes;
pub use unions::find_old_unions;
pub use version_checks::{find_misordered_branches, find_version_check_errors};
