//! Parsed stub file: immutable text, its line vector and the tree-sitter tree.

use tree_sitter::{Node, Parser, Tree};

use crate::errors::{StubfixError, StubfixResult};

/// One stub file as read at the start of a pipeline pass.
pub struct SourceFile {
    /// Path relative to the project root, `/`-separated.
    pub rel_path: String,
    pub text: String,
    pub lines: Vec<String>,
    pub tree: Tree,
}

impl SourceFile {
    pub fn parse(rel_path: &str, text: &str) -> StubfixResult<Self> {
        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_python::LANGUAGE.into())
            .map_err(|e| StubfixError::Parse(format!("Failed to set language: {e}")))?;
        let tree = parser
            .parse(text, None)
            .ok_or_else(|| StubfixError::Parse(format!("Failed to parse {rel_path}")))?;
        Ok(Self {
            rel_path: rel_path.to_string(),
            text: text.to_string(),
            lines: split_lines(text),
            tree,
        })
    }

    /// Parse lines joined the way they are written back to disk.
    pub fn from_lines(rel_path: &str, lines: &[String]) -> StubfixResult<Self> {
        Self::parse(rel_path, &join_lines(lines))
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    /// False when the tree contains ERROR or MISSING nodes, or a block
    /// without a statement.
    pub fn is_valid(&self) -> bool {
        self.first_error_row().is_none()
    }

    /// First 0-based row holding a syntax error, if any.
    pub fn first_error_row(&self) -> Option<usize> {
        fn find(node: Node<'_>) -> Option<usize> {
            if node.is_error() || node.is_missing() || is_empty_block(node) {
                return Some(node.start_position().row);
            }
            let mut cursor = node.walk();
            let children: Vec<Node<'_>> = node.children(&mut cursor).collect();
            children.into_iter().find_map(find)
        }
        find(self.root())
    }

    pub fn node_text<'a>(&'a self, node: Node<'_>) -> &'a str {
        &self.text[node.byte_range()]
    }

    pub fn line(&self, row: usize) -> &str {
        self.lines.get(row).map(String::as_str).unwrap_or("")
    }

    /// The part of `node` that lies on its first line.
    pub fn first_line_text<'a>(&'a self, node: Node<'_>) -> &'a str {
        let text = self.node_text(node);
        text.split('\n').next().unwrap_or(text).trim_end_matches('\r')
    }
}

/// tree-sitter accepts `if x:` followed by a dedent as an empty block.
fn is_empty_block(node: Node<'_>) -> bool {
    if node.kind() != "block" {
        return false;
    }
    let mut cursor = node.walk();
    let empty = !node
        .named_children(&mut cursor)
        .any(|child| child.kind() != "comment");
    empty
}

/// Split like Python's `str.splitlines` for `\n` / `\r\n` endings.
pub fn split_lines(text: &str) -> Vec<String> {
    text.lines().map(str::to_string).collect()
}

/// Join lines with a single trailing newline.
pub fn join_lines(lines: &[String]) -> String {
    let mut out = lines.join("\n");
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_stub() {
        let file = SourceFile::parse("a.pyi", "from typing import List\nx: List[int]\n").unwrap();
        assert!(file.is_valid());
        assert_eq!(file.lines.len(), 2);
        assert_eq!(file.first_error_row(), None);
    }

    #[test]
    fn test_parse_invalid_stub() {
        let file = SourceFile::parse("a.pyi", "x: int\ndef f(:\n").unwrap();
        assert!(!file.is_valid());
        assert_eq!(file.first_error_row(), Some(1));
    }

    #[test]
    fn test_empty_block_is_invalid() {
        let file = SourceFile::parse("a.pyi", "import sys\nif sys.version_info >= (3, 9):\nx: int\n").unwrap();
        assert!(!file.is_valid());
        assert_eq!(file.first_error_row(), Some(1));

        let file = SourceFile::parse("a.pyi", "if sys.version_info >= (3, 9):\n    # only a comment\nx: int\n").unwrap();
        assert!(!file.is_valid());

        let file = SourceFile::parse("a.pyi", "if sys.version_info >= (3, 9):\n    ...\nclass A: ...\n").unwrap();
        assert!(file.is_valid());
    }

    #[test]
    fn test_join_lines_has_single_trailing_newline() {
        let lines = vec!["a".to_string(), "b".to_string()];
        assert_eq!(join_lines(&lines), "a\nb\n");
        assert_eq!(split_lines("a\r\nb\n"), lines);
    }
}
