//! `Union[...]` and `Optional[...]` that should use `X | Y` syntax.

use tree_sitter::Node;

use crate::models::{Diagnostic, DiagnosticKind};
use crate::syntax::render::normalize_expression;
use crate::syntax::visitor::{named_children, subscript_parts, unwrap_type};
use crate::syntax::{visit, walk_children, SourceFile, Visitor};

/// Markers on any line of a non-annotation subscript that skip the check.
const NON_ANNOTATION_SKIP: [&str; 3] = ["tuple[", "Callable[", "type["];

fn expression_text(file: &SourceFile, node: Node<'_>) -> String {
    normalize_expression(file.node_text(node))
}

/// Message for a `Union`/`Optional` subscript, if it is one.
fn union_message(file: &SourceFile, node: Node<'_>) -> Option<String> {
    let (value, args) = subscript_parts(node)?;
    if value.kind() != "identifier" {
        return None;
    }
    match file.node_text(value) {
        "Union" => {
            let elements: Vec<Node<'_>> = match args.as_slice() {
                [only] if unwrap_type(*only).kind() == "tuple" => named_children(unwrap_type(*only)),
                [_] | [] => return None,
                many => many.to_vec(),
            };
            let rendered: Vec<String> = elements.iter().map(|e| expression_text(file, *e)).collect();
            Some(format!(
                "Use PEP 604 syntax for Union, e.g. `{}`",
                rendered.join(" | ")
            ))
        }
        "Optional" => {
            let rendered: Vec<String> = args.iter().map(|a| expression_text(file, *a)).collect();
            Some(format!(
                "Use PEP 604 syntax for Optional, e.g. `{} | None`",
                rendered.join(", ")
            ))
        }
        _ => None,
    }
}

fn scan(
    file: &SourceFile,
    node: Node<'_>,
    in_annotation: bool,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if let Some((value, _)) = subscript_parts(node) {
        if value.kind() == "identifier" {
            if !in_annotation {
                let rows = node.start_position().row..=node.end_position().row;
                let skip = rows
                    .into_iter()
                    .any(|row| NON_ANNOTATION_SKIP.iter().any(|m| file.line(row).contains(m)));
                if skip {
                    return;
                }
            }
            if let Some(message) = union_message(file, node) {
                diagnostics.push(Diagnostic::at_row(
                    &file.rel_path,
                    node.start_position().row,
                    DiagnosticKind::Syntax,
                    message,
                ));
            }
        }
    }
    for child in named_children(node) {
        scan(file, child, in_annotation, diagnostics);
    }
}

struct UnionFinder<'f> {
    file: &'f SourceFile,
    diagnostics: Vec<Diagnostic>,
}

impl UnionFinder<'_> {
    fn annotation(&mut self, node: Option<Node<'_>>) {
        if let Some(node) = node {
            scan(self.file, node, true, &mut self.diagnostics);
        }
    }

    fn value(&mut self, node: Option<Node<'_>>) {
        if let Some(node) = node {
            scan(self.file, node, false, &mut self.diagnostics);
        }
    }
}

impl<'t> Visitor<'t> for UnionFinder<'_> {
    fn visit_ann_assign(&mut self, node: Node<'t>) {
        self.annotation(node.child_by_field_name("type"));
        self.value(node.child_by_field_name("right"));
        walk_children(self, node);
    }

    fn visit_parameter(&mut self, node: Node<'t>) {
        self.annotation(node.child_by_field_name("type"));
        walk_children(self, node);
    }

    fn visit_function_def(&mut self, node: Node<'t>) {
        self.annotation(node.child_by_field_name("return_type"));
        walk_children(self, node);
    }

    fn visit_assign(&mut self, node: Node<'t>) {
        self.value(node.child_by_field_name("right"));
        walk_children(self, node);
    }

    fn visit_class_def(&mut self, node: Node<'t>) {
        if let Some(bases) = node.child_by_field_name("superclasses") {
            for base in named_children(bases)
                .into_iter()
                .filter(|b| b.kind() != "keyword_argument")
            {
                self.value(Some(base));
            }
        }
        walk_children(self, node);
    }
}

/// Old-style unions in annotations, assignment values and class bases.
pub fn find_old_unions(file: &SourceFile) -> Vec<Diagnostic> {
    let mut finder = UnionFinder {
        file,
        diagnostics: Vec::new(),
    };
    visit(&mut finder, file.root());
    finder.diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    fn messages(source: &str) -> Vec<String> {
        let file = SourceFile::parse("a.pyi", source).unwrap();
        find_old_unions(&file).iter().map(|d| d.to_string()).collect()
    }

    #[test]
    fn test_annotation_unions() {
        let out = messages("def f(x: Union[int, str]) -> Optional[bytes]: ...\n");
        assert_eq!(
            out,
            vec![
                "a.pyi:1: Use PEP 604 syntax for Union, e.g. `int | str`",
                "a.pyi:1: Use PEP 604 syntax for Optional, e.g. `bytes | None`",
            ]
        );
    }

    #[test]
    fn test_nested_in_annotated_assignment() {
        let out = messages("x: list[Optional[int]]\n");
        assert_eq!(out, vec!["a.pyi:1: Use PEP 604 syntax for Optional, e.g. `int | None`"]);
    }

    #[test]
    fn test_value_skipped_when_line_has_marker() {
        assert!(messages("_A = tuple[Union[int, str], int]\n").is_empty());
        assert_eq!(
            messages("_B = Union[int, str]\n"),
            vec!["a.pyi:1: Use PEP 604 syntax for Union, e.g. `int | str`"]
        );
    }

    #[test]
    fn test_class_bases_checked() {
        let out = messages("class A(Dict[str, Optional[int]]): ...\n");
        assert_eq!(out, vec!["a.pyi:1: Use PEP 604 syntax for Optional, e.g. `int | None`"]);
    }

    #[test]
    fn test_single_member_union_and_pep604_ignored() {
        assert!(messages("x: Union[int]\ny: int | None\n").is_empty());
    }
}
