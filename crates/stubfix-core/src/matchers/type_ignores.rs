//! Removal of `# type: ignore[code]` comments, keeping any comment that
//! followed them on the same line.

use std::sync::LazyLock;

use regex::Regex;

use crate::patch::PatchLedger;
use crate::syntax::SourceFile;

static IGNORE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"  # type: ignore\[[a-z,\-]+\]").unwrap());

/// Edits that remove error-code-qualified ignore comments.
pub fn strip_ignore_codes(file: &SourceFile) -> PatchLedger {
    let mut ledger = PatchLedger::new();
    for (row, line) in file.lines.iter().enumerate() {
        let Some(found) = IGNORE_RE.find(line) else {
            continue;
        };
        let tail = &line[found.end()..];
        let rest = tail.trim();
        let new = if rest.is_empty() {
            String::new()
        } else if rest.starts_with('#') {
            tail.to_string()
        } else {
            format!("  # {rest}")
        };
        ledger.replace(row, &line[found.start()..], new);
    }
    ledger
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::patch::apply;

    fn strip(source: &str) -> Vec<String> {
        let file = SourceFile::parse("a.pyi", source).unwrap();
        apply(&file.lines, &strip_ignore_codes(&file)).unwrap()
    }

    #[test]
    fn test_bare_code_removed() {
        assert_eq!(
            strip("def f(x): ...  # type: ignore[override]\n"),
            vec!["def f(x): ..."]
        );
    }

    #[test]
    fn test_following_comment_kept() {
        assert_eq!(
            strip("x: int  # type: ignore[misc,assignment]  # see issue\n"),
            vec!["x: int  # see issue"]
        );
    }

    #[test]
    fn test_trailing_text_becomes_comment() {
        assert_eq!(
            strip("x: int  # type: ignore[misc] noqa\n"),
            vec!["x: int  # noqa"]
        );
    }

    #[test]
    fn test_unqualified_ignore_untouched() {
        let file = SourceFile::parse("a.pyi", "x: int  # type: ignore\n").unwrap();
        assert!(strip_ignore_codes(&file).is_empty());
    }
}
