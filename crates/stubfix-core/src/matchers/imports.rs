//! Import statements: collection, pruning of flagged names, and redirection
//! of pruned names to the module they now belong to.

use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;
use tree_sitter::Node;

use crate::models::{Diagnostic, DiagnosticKind};
use crate::patch::PatchLedger;
use crate::syntax::visitor::{children_by_field, named_children};
use crate::syntax::{render_import_from, visit, ImportAlias, SourceFile, Visitor};

// ---------------------------------------------------------------------------
// Collected import statements
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImportForm {
    /// `import a.b as c`
    Plain,
    /// `from m import a, b as c`
    From,
    /// `from __future__ import ...`
    Future,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportedName {
    pub alias: ImportAlias,
    pub row: usize,
    /// A `,` token directly follows the name in the source.
    pub trailing_comma: bool,
}

/// The indented block an import sits in, when it is not at module level.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EnclosingBlock {
    pub id: usize,
    /// Statements in the block, comments excluded.
    pub statements: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportStatement {
    pub form: ImportForm,
    /// Empty for [`ImportForm::Plain`].
    pub module: String,
    pub names: Vec<ImportedName>,
    pub wildcard: bool,
    pub text: String,
    pub start_row: usize,
    pub start_col: usize,
    pub end_row: usize,
    pub end_col: usize,
    pub block: Option<EnclosingBlock>,
}

impl ImportStatement {
    pub fn is_single_line(&self) -> bool {
        self.start_row == self.end_row
    }

    /// Names bound in the importing module.
    pub fn bindings(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(move |n| match (self.form, &n.alias.asname) {
            (_, Some(asname)) => asname.as_str(),
            (ImportForm::Plain, None) => n.alias.name.split('.').next().unwrap_or(&n.alias.name),
            (_, None) => n.alias.name.as_str(),
        })
    }

    fn from_node(file: &SourceFile, node: Node<'_>, form: ImportForm) -> Self {
        let module = match form {
            ImportForm::Plain => String::new(),
            ImportForm::Future => "__future__".to_string(),
            ImportForm::From => node
                .child_by_field_name("module_name")
                .map(|m| file.node_text(m).to_string())
                .unwrap_or_default(),
        };
        let names = children_by_field(node, "name")
            .into_iter()
            .map(|name_node| {
                let alias = if name_node.kind() == "aliased_import" {
                    let name = name_node
                        .child_by_field_name("name")
                        .map(|n| file.node_text(n))
                        .unwrap_or_default();
                    let asname = name_node
                        .child_by_field_name("alias")
                        .map(|n| file.node_text(n));
                    ImportAlias::new(name, asname)
                } else {
                    ImportAlias::new(file.node_text(name_node), None)
                };
                ImportedName {
                    alias,
                    row: name_node.start_position().row,
                    trailing_comma: name_node.next_sibling().is_some_and(|s| s.kind() == ","),
                }
            })
            .collect();
        let mut cursor = node.walk();
        let wildcard = node
            .children(&mut cursor)
            .any(|child| child.kind() == "wildcard_import");
        Self {
            form,
            module,
            names,
            wildcard,
            text: file.node_text(node).to_string(),
            start_row: node.start_position().row,
            start_col: node.start_position().column,
            end_row: node.end_position().row,
            end_col: node.end_position().column,
            block: node
                .parent()
                .filter(|parent| parent.kind() == "block")
                .map(|parent| EnclosingBlock {
                    id: parent.id(),
                    statements: named_children(parent).len(),
                }),
        }
    }
}

struct ImportCollector<'f> {
    file: &'f SourceFile,
    statements: Vec<ImportStatement>,
}

impl<'t> Visitor<'t> for ImportCollector<'_> {
    fn visit_import(&mut self, node: Node<'t>) {
        self.statements
            .push(ImportStatement::from_node(self.file, node, ImportForm::Plain));
    }

    fn visit_import_from(&mut self, node: Node<'t>) {
        let form = if node.kind() == "future_import_statement" {
            ImportForm::Future
        } else {
            ImportForm::From
        };
        self.statements
            .push(ImportStatement::from_node(self.file, node, form));
    }
}

/// Every import statement of the file, nested ones included, in source order.
pub fn collect_imports(file: &SourceFile) -> Vec<ImportStatement> {
    let mut collector = ImportCollector {
        file,
        statements: Vec::new(),
    };
    visit(&mut collector, file.root());
    collector.statements
}

/// All names bound by imports anywhere in the file.
pub fn imported_bindings(file: &SourceFile) -> BTreeSet<String> {
    collect_imports(file)
        .iter()
        .flat_map(|stmt| stmt.bindings().map(str::to_string).collect::<Vec<_>>())
        .collect()
}

/// Whether `name` is imported from any of `modules`.
pub fn imports_name(statements: &[ImportStatement], modules: &[&str], name: &str) -> bool {
    statements.iter().any(|stmt| {
        stmt.form == ImportForm::From
            && modules.contains(&stmt.module.as_str())
            && stmt.names.iter().any(|n| n.alias.name == name)
    })
}

/// Row new import statements are inserted before: the first import that is
/// not a `__future__` import, else the line after the last future import,
/// else the top of the file.
pub fn import_anchor(statements: &[ImportStatement]) -> usize {
    if let Some(first) = statements
        .iter()
        .filter(|s| s.form != ImportForm::Future)
        .map(|s| s.start_row)
        .min()
    {
        return first;
    }
    statements
        .iter()
        .map(|s| s.end_row + 1)
        .max()
        .unwrap_or(0)
}

// ---------------------------------------------------------------------------
// Pruning
// ---------------------------------------------------------------------------

/// What happens to a flagged imported name.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameAction {
    /// Remove the name; its users fall back to a builtin.
    Drop,
    /// Remove the name and import `name` from `module` instead.
    Redirect {
        module: &'static str,
        name: &'static str,
    },
}

/// Per-file policy consulted by [`prune_imports`].
pub trait PruneRules {
    fn action(&self, module: &str, name: &str) -> Option<NameAction>;

    /// Replacement for a statement that loses every name. `None` leaves the
    /// statement alone.
    fn emptied_statement(&self, _module: &str) -> Option<String> {
        Some(String::new())
    }

    /// Whether redirected names may be imported from `module` in this file.
    fn redirect_allowed(&self, _module: &str) -> bool {
        true
    }

    /// Informational note for names that are left in place.
    fn advisory(&self, _module: &str, _name: &str) -> Option<String> {
        None
    }
}

#[derive(Debug, Default)]
pub struct PruneOutcome {
    pub ledger: PatchLedger,
    /// Names removed from their import, whatever their action.
    pub removed: BTreeSet<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Propose the edits that remove every flagged name from `from` imports.
pub fn prune_imports(file: &SourceFile, rules: &dyn PruneRules) -> PruneOutcome {
    let statements = collect_imports(file);
    let mut outcome = PruneOutcome::default();
    // target module -> (original name, alias to import)
    let mut redirects: BTreeMap<&'static str, BTreeMap<String, ImportAlias>> = BTreeMap::new();
    let mut emptied: Vec<(&ImportStatement, String)> = Vec::new();

    for stmt in statements
        .iter()
        .filter(|s| s.form == ImportForm::From && !s.wildcard)
    {
        let mut flagged: Vec<(&ImportedName, NameAction)> = Vec::new();
        for imported in &stmt.names {
            match rules.action(&stmt.module, &imported.alias.name) {
                Some(action) => flagged.push((imported, action)),
                None => {
                    if let Some(note) = rules.advisory(&stmt.module, &imported.alias.name) {
                        outcome.diagnostics.push(Diagnostic::at_row(
                            &file.rel_path,
                            stmt.start_row,
                            DiagnosticKind::Advisory,
                            note,
                        ));
                    }
                }
            }
        }
        if flagged.is_empty() {
            continue;
        }

        for (imported, action) in &flagged {
            outcome.removed.insert(imported.alias.name.clone());
            if let NameAction::Redirect { module, name } = action {
                if rules.redirect_allowed(module) {
                    redirects.entry(*module).or_default().insert(
                        imported.alias.name.clone(),
                        ImportAlias::new(name, imported.alias.asname.as_deref()),
                    );
                }
            }
        }

        let survivors: Vec<ImportAlias> = stmt
            .names
            .iter()
            .filter(|n| !flagged.iter().any(|(f, _)| f.row == n.row && f.alias == n.alias))
            .map(|n| n.alias.clone())
            .collect();

        if survivors.is_empty() {
            match rules.emptied_statement(&stmt.module) {
                Some(replacement) => emptied.push((stmt, replacement)),
                None => debug!(
                    path = %file.rel_path,
                    line = stmt.start_row + 1,
                    "keeping emptied import"
                ),
            }
        } else if stmt.is_single_line() {
            outcome.ledger.replace(
                stmt.start_row,
                stmt.text.clone(),
                render_import_from(&stmt.module, &survivors),
            );
        } else {
            for (imported, _) in &flagged {
                let mut old = imported.alias.render();
                if imported.trailing_comma {
                    old.push(',');
                }
                outcome.ledger.delete(imported.row, old);
            }
        }
    }

    // A block must keep a statement; the first deleted import in a block
    // that would end up empty becomes `...`.
    let mut deleted_per_block: BTreeMap<usize, usize> = BTreeMap::new();
    for (stmt, replacement) in &emptied {
        if let Some(block) = stmt.block.filter(|_| replacement.is_empty()) {
            *deleted_per_block.entry(block.id).or_default() += 1;
        }
    }
    for (stmt, replacement) in &mut emptied {
        let Some(block) = stmt.block else { continue };
        if replacement.is_empty() && deleted_per_block.get(&block.id) == Some(&block.statements) {
            *replacement = "...".to_string();
            deleted_per_block.remove(&block.id);
        }
    }
    for (stmt, replacement) in &emptied {
        delete_statement(file, stmt, replacement, &mut outcome.ledger);
    }

    if !redirects.is_empty() {
        let anchor = import_anchor(&statements);
        for (module, names) in redirects {
            let names: Vec<ImportAlias> = names.into_values().collect();
            outcome
                .ledger
                .insert_before(anchor, render_import_from(module, &names));
        }
    }
    outcome
}

/// Replace a whole statement; multi-line statements are cleared line by line.
fn delete_statement(
    file: &SourceFile,
    stmt: &ImportStatement,
    replacement: &str,
    ledger: &mut PatchLedger,
) {
    if stmt.is_single_line() {
        ledger.replace(stmt.start_row, stmt.text.clone(), replacement);
        return;
    }
    for row in stmt.start_row..=stmt.end_row {
        let line = file.line(row);
        let segment = if row == stmt.start_row {
            line.get(stmt.start_col..).unwrap_or(line)
        } else if row == stmt.end_row {
            line.get(..stmt.end_col).unwrap_or(line)
        } else {
            line
        };
        if segment.trim().is_empty() {
            continue;
        }
        let new = if row == stmt.start_row { replacement } else { "" };
        ledger.replace(row, segment, new);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply;

    struct DropNames(&'static [&'static str]);

    impl PruneRules for DropNames {
        fn action(&self, module: &str, name: &str) -> Option<NameAction> {
            (module == "typing" && self.0.contains(&name)).then_some(NameAction::Drop)
        }
    }

    fn prune(source: &str, rules: &dyn PruneRules) -> (Vec<String>, PruneOutcome) {
        let file = SourceFile::parse("a.pyi", source).unwrap();
        let outcome = prune_imports(&file, rules);
        (apply(&file.lines, &outcome.ledger).unwrap(), outcome)
    }

    #[test]
    fn test_collect_imports_and_bindings() {
        let file = SourceFile::parse(
            "a.pyi",
            "import os.path\nimport numpy as np\nfrom typing import (\n    Dict as _Dict,\n    List,\n)\n",
        )
        .unwrap();
        let statements = collect_imports(&file);
        assert_eq!(statements.len(), 3);
        assert_eq!(statements[2].module, "typing");
        assert_eq!(statements[2].names[0].alias.asname.as_deref(), Some("_Dict"));
        assert!(statements[2].names[0].trailing_comma);
        assert_eq!(statements[2].names[1].row, 4);
        let bindings = imported_bindings(&file);
        assert!(bindings.contains("os"));
        assert!(bindings.contains("np"));
        assert!(bindings.contains("_Dict"));
        assert!(!bindings.contains("Dict"));
    }

    #[test]
    fn test_single_line_partial_removal() {
        let (out, outcome) = prune("from typing import List, Optional\n", &DropNames(&["List"]));
        assert_eq!(out, vec!["from typing import Optional"]);
        assert!(outcome.removed.contains("List"));
    }

    #[test]
    fn test_single_line_total_removal() {
        let (out, _) = prune("from typing import List\nx: int\n", &DropNames(&["List"]));
        assert_eq!(out, vec!["x: int"]);
    }

    #[test]
    fn test_multi_line_surgical_deletion() {
        let source = "from typing import (\n    Dict,\n    Optional,\n)\n";
        let (out, _) = prune(source, &DropNames(&["Dict"]));
        assert_eq!(out, vec!["from typing import (", "    Optional,", ")"]);
    }

    #[test]
    fn test_multi_line_last_name_without_comma() {
        let source = "from typing import (\n    Optional,\n    Dict\n)\n";
        let (out, _) = prune(source, &DropNames(&["Dict"]));
        assert_eq!(out, vec!["from typing import (", "    Optional,", ")"]);
    }

    #[test]
    fn test_multi_line_total_removal() {
        let source = "from typing import (\n    Dict,\n    List,\n)\nx: int\n";
        let (out, _) = prune(source, &DropNames(&["Dict", "List"]));
        assert_eq!(out, vec!["x: int"]);
    }

    #[test]
    fn test_only_statement_of_block_becomes_ellipsis() {
        let source = "import sys\nif sys.version_info >= (3, 9):\n    from typing import List\nx: int\n";
        let (out, _) = prune(source, &DropNames(&["List"]));
        assert_eq!(
            out,
            vec!["import sys", "if sys.version_info >= (3, 9):", "    ...", "x: int"]
        );
    }

    #[test]
    fn test_emptied_block_keeps_one_ellipsis() {
        let source = "class A:\n    from typing import (\n        List,\n    )\n    from typing import Dict\n";
        let (out, _) = prune(source, &DropNames(&["List", "Dict"]));
        assert_eq!(out, vec!["class A:", "    ..."]);
        let reparsed = SourceFile::from_lines("a.pyi", &out).unwrap();
        assert!(reparsed.is_valid());
    }

    #[test]
    fn test_block_with_other_statements_drops_import() {
        let source = "if sys.platform == \"linux\":\n    from typing import List\n    x: int\n";
        let (out, _) = prune(source, &DropNames(&["List"]));
        assert_eq!(out, vec!["if sys.platform == \"linux\":", "    x: int"]);
    }

    #[test]
    fn test_redirects_grouped_per_module_and_sorted() {
        struct Redirecting;
        impl PruneRules for Redirecting {
            fn action(&self, _module: &str, name: &str) -> Option<NameAction> {
                match name {
                    "Deque" => Some(NameAction::Redirect {
                        module: "collections",
                        name: "deque",
                    }),
                    "Sequence" | "Iterable" => Some(NameAction::Redirect {
                        module: "collections.abc",
                        name: if name == "Sequence" { "Sequence" } else { "Iterable" },
                    }),
                    _ => None,
                }
            }
        }
        let source = "import sys\nfrom typing import Sequence, Any\nfrom typing import Iterable, Deque as _D\n";
        let (out, outcome) = prune(source, &Redirecting);
        assert_eq!(
            out,
            vec![
                "from collections import deque as _D",
                "from collections.abc import Iterable, Sequence",
                "import sys",
                "from typing import Any",
            ]
        );
        assert_eq!(outcome.removed.len(), 3);
    }

    #[test]
    fn test_anchor_skips_future_imports() {
        let file = SourceFile::parse(
            "a.pyi",
            "from __future__ import annotations\n\nx: int\n",
        )
        .unwrap();
        assert_eq!(import_anchor(&collect_imports(&file)), 1);
    }

    #[test]
    fn test_other_modules_untouched() {
        let (out, outcome) = prune("from foo import List\n", &DropNames(&["List"]));
        assert_eq!(out, vec!["from foo import List"]);
        assert!(outcome.ledger.is_empty());
    }
}
