//! Detection of module- and class-level assignments that are really type
//! aliases, and their rewrite to `name: TypeAlias = value`.
//!
//! Whether a `_Foo = _Bar` assignment is an alias depends on `_Foo` being
//! used in an annotation somewhere in the file, before or after the
//! assignment, so the decision is only taken once the whole tree has been
//! visited. Rewriting `_C = _A` makes `_A` part of an annotation in turn,
//! so verdicts are iterated until no new annotation names appear; a second
//! run over the output then finds nothing left to do.

use std::collections::HashSet;

use tracing::debug;
use tree_sitter::Node;

use crate::patch::PatchLedger;
use crate::syntax::visitor::named_children;
use crate::syntax::{visit, walk_children, SourceFile, Visitor};

/// Trailing comment that keeps an assignment as it is.
pub const SUPPRESSION_MARKER: &str = "# noqa: Y026";

/// What the right-hand side of an assignment looks like.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ValueShape {
    /// Calls, `...`, numbers, strings, bytes and booleans.
    Literal,
    /// `_Bar`
    Name,
    /// `mod.Bar`
    Attribute,
    /// `a.b.C` and other attribute chains; left alone.
    NestedAttribute,
    /// Anything else: subscripts, unions, `None`, tuples.
    TypeExpression,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CandidateAssignment {
    pub target: String,
    pub row: usize,
    /// Source text from the target up to the value, e.g. `_Foo = `.
    pub prefix: String,
    pub shape: ValueShape,
    /// Identifiers the value would contribute to annotations once rewritten.
    pub value_names: HashSet<String>,
    pub suppressed: bool,
    pub referenced_in_annotation: bool,
}

impl CandidateAssignment {
    pub fn is_alias(&self) -> bool {
        match self.shape {
            ValueShape::TypeExpression => true,
            ValueShape::Name | ValueShape::Attribute => self.referenced_in_annotation,
            ValueShape::Literal | ValueShape::NestedAttribute => false,
        }
    }
}

fn classify(node: Node<'_>) -> ValueShape {
    match node.kind() {
        "call" | "ellipsis" | "integer" | "float" | "string" | "concatenated_string" | "true"
        | "false" => ValueShape::Literal,
        "unary_operator" => match node.child_by_field_name("argument").map(|a| a.kind()) {
            Some("integer" | "float") => ValueShape::Literal,
            _ => ValueShape::TypeExpression,
        },
        "identifier" => ValueShape::Name,
        "attribute" => match node.child_by_field_name("object").map(|o| o.kind()) {
            Some("identifier") => ValueShape::Attribute,
            _ => ValueShape::NestedAttribute,
        },
        _ => ValueShape::TypeExpression,
    }
}

/// Identifiers used in an annotation; attribute accesses contribute nothing.
fn collect_annotation_names(file: &SourceFile, node: Node<'_>, out: &mut HashSet<String>) {
    match node.kind() {
        "identifier" => {
            out.insert(file.node_text(node).to_string());
        }
        "attribute" | "member_type" => {}
        _ => {
            for child in named_children(node) {
                collect_annotation_names(file, child, out);
            }
        }
    }
}

struct AliasFinder<'f> {
    file: &'f SourceFile,
    class_depth: usize,
    annotation_names: HashSet<String>,
    assignments: Vec<CandidateAssignment>,
}

impl<'t> Visitor<'t> for AliasFinder<'_> {
    fn visit_class_def(&mut self, node: Node<'t>) {
        self.class_depth += 1;
        walk_children(self, node);
        self.class_depth -= 1;
    }

    fn visit_function_def(&mut self, node: Node<'t>) {
        if let Some(returns) = node.child_by_field_name("return_type") {
            collect_annotation_names(self.file, returns, &mut self.annotation_names);
        }
        walk_children(self, node);
    }

    fn visit_parameter(&mut self, node: Node<'t>) {
        if let Some(annotation) = node.child_by_field_name("type") {
            collect_annotation_names(self.file, annotation, &mut self.annotation_names);
        }
        walk_children(self, node);
    }

    fn visit_ann_assign(&mut self, node: Node<'t>) {
        collect_annotation_names(self.file, node, &mut self.annotation_names);
        walk_children(self, node);
    }

    fn visit_assign(&mut self, node: Node<'t>) {
        walk_children(self, node);

        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return;
        };
        if left.kind() != "identifier" || right.kind() == "assignment" {
            return;
        }
        let target = self.file.node_text(left);
        if !target.starts_with('_') {
            return;
        }
        let in_class = self.class_depth > 0;
        if (in_class && target == "__match_args__") || (!in_class && target == "__all__") {
            return;
        }
        let row = left.start_position().row;
        if right.start_position().row != row {
            return;
        }
        let mut value_names = HashSet::new();
        collect_annotation_names(self.file, right, &mut value_names);
        self.assignments.push(CandidateAssignment {
            target: target.to_string(),
            row,
            prefix: self.file.text[left.start_byte()..right.start_byte()].to_string(),
            shape: classify(right),
            value_names,
            suppressed: self.file.line(row).contains(SUPPRESSION_MARKER),
            referenced_in_annotation: false,
        });
    }
}

/// Every underscore-prefixed assignment in the file with its alias verdict
/// inputs filled in, in source order.
pub fn find_alias_candidates(file: &SourceFile) -> Vec<CandidateAssignment> {
    let mut finder = AliasFinder {
        file,
        class_depth: 0,
        annotation_names: HashSet::new(),
        assignments: Vec::new(),
    };
    visit(&mut finder, file.root());
    let AliasFinder {
        mut annotation_names,
        mut assignments,
        ..
    } = finder;
    loop {
        for assignment in &mut assignments {
            assignment.referenced_in_annotation = annotation_names.contains(&assignment.target);
        }
        let before = annotation_names.len();
        for assignment in assignments.iter().filter(|a| a.is_alias() && !a.suppressed) {
            annotation_names.extend(assignment.value_names.iter().cloned());
        }
        if annotation_names.len() == before {
            break;
        }
    }
    assignments
}

/// Edits that annotate alias assignments with `TypeAlias`, plus the number
/// of assignments rewritten.
pub fn alias_rewrites(file: &SourceFile) -> (PatchLedger, usize) {
    let candidates = find_alias_candidates(file);
    let mut ledger = PatchLedger::new();
    let mut rewritten = 0;
    // Unconditional rewrites first, then the ones that needed annotation usage.
    let (immediate, deferred): (Vec<_>, Vec<_>) = candidates
        .iter()
        .filter(|c| c.is_alias())
        .partition(|c| c.shape == ValueShape::TypeExpression);
    for candidate in immediate.into_iter().chain(deferred) {
        if candidate.suppressed {
            debug!(path = %file.rel_path, line = candidate.row + 1, "alias suppressed");
            continue;
        }
        ledger.replace(
            candidate.row,
            candidate.prefix.clone(),
            format!("{}: TypeAlias = ", candidate.target),
        );
        rewritten += 1;
    }
    (ledger, rewritten)
}
