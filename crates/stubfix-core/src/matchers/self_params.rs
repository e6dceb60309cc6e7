//! First parameters annotated with `Self` or `type[Self]`.

use tree_sitter::Node;

use crate::patch::PatchLedger;
use crate::syntax::visitor::{named_children, subscript_parts, unwrap_type};
use crate::syntax::{visit, walk_children, SourceFile, Visitor};

fn is_self(file: &SourceFile, node: Node<'_>) -> bool {
    node.kind() == "identifier" && file.node_text(node) == "Self"
}

fn is_self_annotation(file: &SourceFile, annotation: Node<'_>) -> bool {
    let annotation = unwrap_type(annotation);
    if is_self(file, annotation) {
        return true;
    }
    match subscript_parts(annotation) {
        Some((value, args)) => {
            value.kind() == "identifier"
                && file.node_text(value) == "type"
                && matches!(args.as_slice(), [only] if is_self(file, unwrap_type(*only)))
        }
        None => false,
    }
}

struct SelfParamFinder<'f> {
    file: &'f SourceFile,
    ledger: PatchLedger,
}

impl<'t> Visitor<'t> for SelfParamFinder<'_> {
    fn visit_function_def(&mut self, node: Node<'t>) {
        let first = node
            .child_by_field_name("parameters")
            .and_then(|params| named_children(params).into_iter().next());
        if let Some(param) = first.filter(|p| p.kind() == "typed_parameter") {
            let name = named_children(param)
                .into_iter()
                .next()
                .filter(|n| n.kind() == "identifier");
            let annotation = param.child_by_field_name("type");
            if let (Some(name), Some(annotation)) = (name, annotation) {
                let text = self.file.node_text(param);
                if is_self_annotation(self.file, annotation) && !text.contains('\n') {
                    self.ledger.replace(
                        param.start_position().row,
                        text,
                        self.file.node_text(name),
                    );
                }
            }
        }
        walk_children(self, node);
    }
}

/// Edits that drop the annotation from `self: Self` and `cls: type[Self]`.
pub fn strip_self_annotations(file: &SourceFile) -> PatchLedger {
    let mut finder = SelfParamFinder {
        file,
        ledger: PatchLedger::new(),
    };
    visit(&mut finder, file.root());
    finder.ledger
}
