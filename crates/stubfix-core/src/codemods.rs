//! The codemod family: each one composes matchers into a ledger for one file.

use std::collections::BTreeSet;

use tracing::debug;

use crate::config::TypeshedConfig;
use crate::matchers::imports::{collect_imports, import_anchor, imported_bindings, imports_name};
use crate::matchers::{
    alias_rewrites, lower_subscripts, prune_imports, strip_ignore_codes, strip_self_annotations,
    NameAction, PruneRules,
};
use crate::models::Diagnostic;
use crate::patch::{find_token_aligned, PatchLedger};
use crate::syntax::SourceFile;

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

/// Run-wide inputs every codemod may consult.
#[derive(Clone, Copy, Debug)]
pub struct CodemodContext<'c> {
    pub config: &'c TypeshedConfig,
}

/// What a codemod proposes for one file.
#[derive(Debug, Default)]
pub struct Plan {
    pub ledger: PatchLedger,
    /// Names that lost their import; consulted by the fix-up pass.
    pub removed_names: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

pub trait Codemod: Send + Sync {
    fn name(&self) -> &'static str;

    /// Edits against the file's original lines.
    fn plan(&self, file: &SourceFile, ctx: &CodemodContext<'_>) -> Plan;

    /// Edits against the reparsed, once-patched file.
    fn fixup(&self, _file: &SourceFile, _plan: &Plan, _ctx: &CodemodContext<'_>) -> PatchLedger {
        PatchLedger::new()
    }
}

/// Codemods selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum CodemodKind {
    Pep585,
    TypeAliases,
    SelfAnnotations,
    TypeIgnores,
}

impl CodemodKind {
    /// What a bare migration runs.
    pub const DEFAULT: [CodemodKind; 2] = [CodemodKind::Pep585, CodemodKind::TypeAliases];

    pub fn build(self) -> Box<dyn Codemod> {
        match self {
            CodemodKind::Pep585 => Box::new(Pep585),
            CodemodKind::TypeAliases => Box::new(TypeAliases),
            CodemodKind::SelfAnnotations => Box::new(SelfAnnotations),
            CodemodKind::TypeIgnores => Box::new(TypeIgnores),
        }
    }
}

// ---------------------------------------------------------------------------
// pep585
// ---------------------------------------------------------------------------

const BUILTIN_GENERICS: [&str; 5] = ["List", "FrozenSet", "Set", "Dict", "Tuple"];

/// Typing names and what they are called in `collections`.
const COLLECTIONS_NAMES: [(&str, &str); 5] = [
    ("Counter", "Counter"),
    ("Deque", "deque"),
    ("DefaultDict", "defaultdict"),
    ("OrderedDict", "OrderedDict"),
    ("ChainMap", "ChainMap"),
];

const COLLECTIONS_ABC_NAMES: [&str; 24] = [
    "ByteString",
    "Collection",
    "Container",
    "ItemsView",
    "KeysView",
    "Mapping",
    "MappingView",
    "MutableMapping",
    "MutableSequence",
    "MutableSet",
    "Sequence",
    "ValuesView",
    "Iterable",
    "Iterator",
    "Generator",
    "Hashable",
    "Reversible",
    "Sized",
    "Coroutine",
    "AsyncGenerator",
    "AsyncIterable",
    "AsyncIterator",
    "Awaitable",
    "Callable",
];

/// Removed names whose subscripts have a lowercase builtin spelling.
const LOWERABLE: [&str; 7] = ["List", "FrozenSet", "Set", "Dict", "Tuple", "Deque", "DefaultDict"];

/// Files that define the abstract collections themselves.
const ABC_EXEMPT_PATHS: [&str; 3] = [
    "stdlib/_collections_abc.pyi",
    "stdlib/types.pyi",
    "stdlib/array.pyi",
];

const CSV_PATH: &str = "stdlib/csv.pyi";
const COLLECTIONS_PATH: &str = "stdlib/collections/__init__.pyi";
/// Imports `Dict as _Dict`; the alias is spelled out once the import is gone.
const PLISTLIB_PATH: &str = "stdlib/plistlib.pyi";
const PLISTLIB_ALIAS: &str = "_Dict";

struct Pep585Rules<'a> {
    rel_path: &'a str,
}

impl PruneRules for Pep585Rules<'_> {
    fn action(&self, module: &str, name: &str) -> Option<NameAction> {
        if module != "typing" {
            return None;
        }
        if BUILTIN_GENERICS.contains(&name) {
            return Some(NameAction::Drop);
        }
        if let Some((_, target)) = COLLECTIONS_NAMES.iter().find(|(typing, _)| *typing == name) {
            return Some(NameAction::Redirect {
                module: "collections",
                name: *target,
            });
        }
        if ABC_EXEMPT_PATHS.contains(&self.rel_path) {
            return None;
        }
        COLLECTIONS_ABC_NAMES
            .iter()
            .find(|abc| **abc == name)
            .map(|abc| NameAction::Redirect {
                module: "collections.abc",
                name: *abc,
            })
    }

    fn emptied_statement(&self, _module: &str) -> Option<String> {
        match self.rel_path {
            CSV_PATH => Some("_DictReadMapping = dict".to_string()),
            COLLECTIONS_PATH => None,
            _ => Some(String::new()),
        }
    }

    fn redirect_allowed(&self, module: &str) -> bool {
        !(self.rel_path == COLLECTIONS_PATH && module == "collections.abc")
    }

    fn advisory(&self, module: &str, name: &str) -> Option<String> {
        (module == "typing" && name == "AbstractSet").then(|| "typing.AbstractSet".to_string())
    }
}

/// Builtin and `collections` generics instead of their `typing` aliases.
pub struct Pep585;

impl Codemod for Pep585 {
    fn name(&self) -> &'static str {
        "pep585"
    }

    fn plan(&self, file: &SourceFile, _ctx: &CodemodContext<'_>) -> Plan {
        let outcome = prune_imports(
            file,
            &Pep585Rules {
                rel_path: &file.rel_path,
            },
        );
        Plan {
            ledger: outcome.ledger,
            removed_names: outcome.removed,
            diagnostics: outcome.diagnostics,
        }
    }

    fn fixup(&self, file: &SourceFile, plan: &Plan, _ctx: &CodemodContext<'_>) -> PatchLedger {
        let still_bound = imported_bindings(file);
        let names: BTreeSet<String> = plan
            .removed_names
            .iter()
            .filter(|name| LOWERABLE.contains(&name.as_str()) && !still_bound.contains(*name))
            .cloned()
            .collect();
        debug!(path = %file.rel_path, names = ?names, "lowering subscripts");
        let mut ledger = lower_subscripts(file, &names);
        if file.rel_path == PLISTLIB_PATH && !still_bound.contains(PLISTLIB_ALIAS) {
            for (row, line) in file.lines.iter().enumerate() {
                if find_token_aligned(line, PLISTLIB_ALIAS, 0).is_some() {
                    ledger.replace_every(row, PLISTLIB_ALIAS, "dict");
                }
            }
        }
        ledger
    }
}

// ---------------------------------------------------------------------------
// type-aliases
// ---------------------------------------------------------------------------

/// `_Alias = X` rewritten to `_Alias: TypeAlias = X`.
pub struct TypeAliases;

impl Codemod for TypeAliases {
    fn name(&self) -> &'static str {
        "type-aliases"
    }

    fn plan(&self, file: &SourceFile, ctx: &CodemodContext<'_>) -> Plan {
        let (mut ledger, rewritten) = alias_rewrites(file);
        if rewritten > 0 {
            let statements = collect_imports(file);
            if !imports_name(&statements, &["typing", "typing_extensions"], "TypeAlias") {
                ledger.insert_before(
                    import_anchor(&statements),
                    format!("from {} import TypeAlias", ctx.config.type_alias_module()),
                );
            }
        }
        Plan {
            ledger,
            ..Plan::default()
        }
    }
}

// ---------------------------------------------------------------------------
// self-annotations
// ---------------------------------------------------------------------------

struct SelfRules {
    already_imported: bool,
}

impl PruneRules for SelfRules {
    fn action(&self, module: &str, name: &str) -> Option<NameAction> {
        (module == "_typeshed" && name == "Self").then_some(NameAction::Redirect {
            module: "typing_extensions",
            name: "Self",
        })
    }

    fn redirect_allowed(&self, _module: &str) -> bool {
        !self.already_imported
    }
}

/// `Self` from `typing_extensions`, and no annotation on `self: Self`.
pub struct SelfAnnotations;

impl Codemod for SelfAnnotations {
    fn name(&self) -> &'static str {
        "self-annotations"
    }

    fn plan(&self, file: &SourceFile, _ctx: &CodemodContext<'_>) -> Plan {
        let statements = collect_imports(file);
        if !imports_name(&statements, &["_typeshed"], "Self") {
            return Plan::default();
        }
        let rules = SelfRules {
            already_imported: imports_name(&statements, &["typing", "typing_extensions"], "Self"),
        };
        let mut outcome = prune_imports(file, &rules);
        outcome.ledger.extend(strip_self_annotations(file));
        Plan {
            ledger: outcome.ledger,
            removed_names: outcome.removed,
            diagnostics: outcome.diagnostics,
        }
    }
}

// ---------------------------------------------------------------------------
// type-ignores
// ---------------------------------------------------------------------------

/// Error codes dropped from `# type: ignore[...]` comments.
pub struct TypeIgnores;

impl Codemod for TypeIgnores {
    fn name(&self) -> &'static str {
        "type-ignores"
    }

    fn plan(&self, file: &SourceFile, _ctx: &CodemodContext<'_>) -> Plan {
        Plan {
            ledger: strip_ignore_codes(file),
            ..Plan::default()
        }
    }
}
