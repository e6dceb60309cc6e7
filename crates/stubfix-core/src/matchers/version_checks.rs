//! `sys.version_info` comparisons: branch order and redundancy.

use tree_sitter::Node;

use crate::models::{Diagnostic, DiagnosticKind};
use crate::syntax::render::normalize_expression;
use crate::syntax::visitor::{children_by_field, named_children};
use crate::syntax::{visit, walk_children, SourceFile, Visitor};

/// The `if` clause and every `elif` clause of an `if` statement, each with
/// the clause that follows it.
fn clauses(node: Node<'_>) -> Vec<(Node<'_>, Option<Node<'_>>)> {
    let alternatives = children_by_field(node, "alternative");
    let mut out = vec![(node, alternatives.first().copied())];
    for (index, alt) in alternatives.iter().enumerate() {
        if alt.kind() == "elif_clause" {
            out.push((*alt, alternatives.get(index + 1).copied()));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Branch order
// ---------------------------------------------------------------------------

struct IfOrderChecker<'f> {
    file: &'f SourceFile,
    diagnostics: Vec<Diagnostic>,
}

impl<'t> Visitor<'t> for IfOrderChecker<'_> {
    fn visit_if(&mut self, node: Node<'t>) {
        for (clause, next) in clauses(node) {
            let Some(condition) = clause.child_by_field_name("condition") else {
                continue;
            };
            if condition.kind() != "comparison_operator"
                || !next.is_some_and(|n| n.kind() == "else_clause")
            {
                continue;
            }
            let test = normalize_expression(self.file.node_text(condition));
            if test.starts_with("sys.version_info < ") {
                self.diagnostics.push(Diagnostic::at_row(
                    &self.file.rel_path,
                    clause.start_position().row,
                    DiagnosticKind::Syntax,
                    format!(
                        "When using if/else with sys.version_info, put the code for new Python versions first, e.g. `if {}`",
                        test.replacen('<', ">=", 1)
                    ),
                ));
            }
        }
        walk_children(self, node);
    }
}

/// `if sys.version_info < X: ... else: ...` chains that put the old branch first.
pub fn find_misordered_branches(file: &SourceFile) -> Vec<Diagnostic> {
    let mut checker = IfOrderChecker {
        file,
        diagnostics: Vec::new(),
    };
    visit(&mut checker, file.root());
    checker.diagnostics
}

// ---------------------------------------------------------------------------
// Minimum version
// ---------------------------------------------------------------------------

fn is_version_info(file: &SourceFile, node: Node<'_>) -> bool {
    node.kind() == "attribute"
        && node
            .child_by_field_name("object")
            .is_some_and(|o| o.kind() == "identifier" && file.node_text(o) == "sys")
        && node
            .child_by_field_name("attribute")
            .is_some_and(|a| file.node_text(a) == "version_info")
}

fn integer_value(file: &SourceFile, node: Node<'_>) -> Option<u64> {
    (node.kind() == "integer")
        .then(|| file.node_text(node).replace('_', "").parse().ok())
        .flatten()
}

struct MinVersionChecker<'f> {
    file: &'f SourceFile,
    minimum_minor: u32,
    diagnostics: Vec<Diagnostic>,
}

impl MinVersionChecker<'_> {
    fn check(&mut self, clause: Node<'_>, condition: Node<'_>) {
        if condition.kind() != "comparison_operator" {
            return;
        }
        let operators = children_by_field(condition, "operators");
        let operands = named_children(condition);
        let ([op], [left, right]) = (operators.as_slice(), operands.as_slice()) else {
            return;
        };
        if !is_version_info(self.file, *left) || right.kind() != "tuple" {
            return;
        }
        let elements = named_children(*right);
        let [major, minor] = elements.as_slice() else {
            return;
        };
        let message = match (integer_value(self.file, *major), integer_value(self.file, *minor)) {
            (Some(3), Some(minor)) => match op.kind() {
                ">=" | "<" if minor <= u64::from(self.minimum_minor) => format!(
                    "Redundant `sys.version_info` check (3.{} is the lowest Python version supported by typeshed)",
                    self.minimum_minor
                ),
                ">=" | "<" => return,
                other => format!(
                    "Invalid `sys.version_info` check (must use either \"<\" or \">=\", not {other})"
                ),
            },
            (Some(_), Some(_)) => {
                "Redundant `sys.version_info` check (typeshed only supports Python 3)".to_string()
            }
            _ => "Invalid `sys.version_info` check".to_string(),
        };
        self.diagnostics.push(Diagnostic::at_row(
            &self.file.rel_path,
            clause.start_position().row,
            DiagnosticKind::Syntax,
            message,
        ));
    }
}

impl<'t> Visitor<'t> for MinVersionChecker<'_> {
    fn visit_if(&mut self, node: Node<'t>) {
        walk_children(self, node);
        // Inner clauses first, like nested ifs.
        for (clause, _) in clauses(node).into_iter().rev() {
            if let Some(condition) = clause.child_by_field_name("condition") {
                self.check(clause, condition);
            }
        }
    }
}

/// Version checks that are malformed or redundant given the minimum
/// supported Python version.
pub fn find_version_check_errors(file: &SourceFile, minimum_minor: u32) -> Vec<Diagnostic> {
    let mut checker = MinVersionChecker {
        file,
        minimum_minor,
        diagnostics: Vec::new(),
    };
    visit(&mut checker, file.root());
    checker.diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(source: &str) -> Vec<String> {
        let file = SourceFile::parse("a.pyi", source).unwrap();
        find_misordered_branches(&file).iter().map(|d| d.to_string()).collect()
    }

    fn versions(source: &str) -> Vec<String> {
        let file = SourceFile::parse("a.pyi", source).unwrap();
        find_version_check_errors(&file, 7)
            .iter()
            .map(|d| d.to_string())
            .collect()
    }

    #[test]
    fn test_old_branch_first_with_else() {
        let out = order("if sys.version_info < (3, 9):\n    x: int\nelse:\n    x: str\n");
        assert_eq!(
            out,
            vec!["a.pyi:1: When using if/else with sys.version_info, put the code for new Python versions first, e.g. `if sys.version_info >= (3, 9)`"]
        );
    }

    #[test]
    fn test_elif_chain_not_reported() {
        let source = "if sys.version_info < (3, 9):\n    x: int\nelif sys.version_info < (3, 10):\n    x: str\n";
        assert!(order(source).is_empty());
        assert!(order("if sys.version_info >= (3, 9):\n    x: int\nelse:\n    x: str\n").is_empty());
    }

    #[test]
    fn test_redundant_and_invalid_checks() {
        let source = "if sys.version_info >= (3, 7):\n    a: int\nif sys.version_info >= (2, 7):\n    b: int\nif sys.version_info == (3, 9):\n    c: int\nif sys.version_info >= (3, x):\n    d: int\nif sys.version_info >= (3, 8):\n    e: int\n";
        assert_eq!(
            versions(source),
            vec![
                "a.pyi:1: Redundant `sys.version_info` check (3.7 is the lowest Python version supported by typeshed)",
                "a.pyi:3: Redundant `sys.version_info` check (typeshed only supports Python 3)",
                "a.pyi:5: Invalid `sys.version_info` check (must use either \"<\" or \">=\", not ==)",
                "a.pyi:7: Invalid `sys.version_info` check",
            ]
        );
    }

    #[test]
    fn test_nested_checks_reported_inner_first() {
        let source = "if sys.version_info >= (3, 6):\n    if sys.version_info < (3, 5):\n        a: int\n";
        let out = versions(source);
        assert_eq!(out.len(), 2);
        assert!(out[0].starts_with("a.pyi:2:"));
        assert!(out[1].starts_with("a.pyi:1:"));
    }
}
