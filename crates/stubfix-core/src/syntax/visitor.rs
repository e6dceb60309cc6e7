//! Per-node-kind dispatch over the tree-sitter Python grammar.
//!
//! Every handler of [`Visitor`] defaults to recursing into the node's named
//! children, so a matcher only overrides the kinds it cares about and calls
//! [`walk_children`] itself when it wants to keep descending.

use tree_sitter::Node;

/// The closed set of node categories the matchers dispatch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Module,
    ClassDef,
    FunctionDef,
    /// A parameter carrying an annotation.
    Parameter,
    Import,
    ImportFrom,
    /// `target = value`
    Assign,
    /// `target: annotation` with or without a value.
    AnnAssign,
    If,
    /// `Name[...]`, both as an expression and inside a type.
    Subscript,
    Attribute,
    Name,
    Comment,
    Other,
}

impl NodeKind {
    pub fn of(node: Node<'_>) -> Self {
        match node.kind() {
            "module" => NodeKind::Module,
            "class_definition" => NodeKind::ClassDef,
            "function_definition" => NodeKind::FunctionDef,
            "typed_parameter" | "typed_default_parameter" => NodeKind::Parameter,
            "import_statement" => NodeKind::Import,
            "import_from_statement" | "future_import_statement" => NodeKind::ImportFrom,
            "assignment" => {
                if node.child_by_field_name("type").is_some() {
                    NodeKind::AnnAssign
                } else {
                    NodeKind::Assign
                }
            }
            "if_statement" => NodeKind::If,
            "subscript" | "generic_type" => NodeKind::Subscript,
            "attribute" | "member_type" => NodeKind::Attribute,
            "identifier" => NodeKind::Name,
            "comment" => NodeKind::Comment,
            _ => NodeKind::Other,
        }
    }
}

pub trait Visitor<'t> {
    fn visit_module(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_class_def(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_function_def(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_parameter(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_import(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_import_from(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_assign(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_ann_assign(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_if(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_subscript(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_attribute(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }

    fn visit_name(&mut self, _node: Node<'t>) {}

    fn visit_other(&mut self, node: Node<'t>) {
        walk_children(self, node);
    }
}

/// Dispatch `node` to the handler for its kind.
pub fn visit<'t, V: Visitor<'t> + ?Sized>(visitor: &mut V, node: Node<'t>) {
    match NodeKind::of(node) {
        NodeKind::Module => visitor.visit_module(node),
        NodeKind::ClassDef => visitor.visit_class_def(node),
        NodeKind::FunctionDef => visitor.visit_function_def(node),
        NodeKind::Parameter => visitor.visit_parameter(node),
        NodeKind::Import => visitor.visit_import(node),
        NodeKind::ImportFrom => visitor.visit_import_from(node),
        NodeKind::Assign => visitor.visit_assign(node),
        NodeKind::AnnAssign => visitor.visit_ann_assign(node),
        NodeKind::If => visitor.visit_if(node),
        NodeKind::Subscript => visitor.visit_subscript(node),
        NodeKind::Attribute => visitor.visit_attribute(node),
        NodeKind::Name => visitor.visit_name(node),
        NodeKind::Comment => {}
        NodeKind::Other => visitor.visit_other(node),
    }
}

pub fn walk_children<'t, V: Visitor<'t> + ?Sized>(visitor: &mut V, node: Node<'t>) {
    for child in named_children(node) {
        visit(visitor, child);
    }
}

// ---------------------------------------------------------------------------
// Node helpers shared by the matchers
// ---------------------------------------------------------------------------

/// Named children with comments filtered out.
pub fn named_children(node: Node<'_>) -> Vec<Node<'_>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

pub fn children_by_field<'t>(node: Node<'t>, field: &str) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.children_by_field_name(field, &mut cursor)
        .filter(|child| child.kind() != "comment")
        .collect()
}

/// Unwrap the `type` wrapper tree-sitter puts around annotation expressions.
pub fn unwrap_type(node: Node<'_>) -> Node<'_> {
    let mut current = node;
    while current.kind() == "type" || current.kind() == "parenthesized_expression" {
        match named_children(current).as_slice() {
            [only] => current = *only,
            _ => break,
        }
    }
    current
}

/// The subscripted value and its index expressions, for either spelling of
/// a subscript.
pub fn subscript_parts(node: Node<'_>) -> Option<(Node<'_>, Vec<Node<'_>>)> {
    match node.kind() {
        "subscript" => {
            let value = node.child_by_field_name("value")?;
            Some((value, children_by_field(node, "subscript")))
        }
        "generic_type" => {
            let children = named_children(node);
            let value = *children.first()?;
            let args = children
                .iter()
                .find(|child| child.kind() == "type_parameter")
                .map(|params| named_children(*params))
                .unwrap_or_default();
            Some((value, args))
        }
        _ => None,
    }
}
