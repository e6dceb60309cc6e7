//! Syntax tree builder adapter: tree-sitter parsing, dispatch and rendering.

pub mod render;
pub mod source;
pub mod visitor;

pub use render::{render_import_from, ImportAlias};
pub use source::{join_lines, split_lines, SourceFile};
pub use visitor::{visit, walk_children, NodeKind, Visitor};
