//! Shared typed models produced by the pipeline and consumed by the orchestrator.

use std::fmt;

use serde::Serialize;

// ---------------------------------------------------------------------------
// 1. Diagnostic
// ---------------------------------------------------------------------------

/// Category of a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    /// The input file could not be parsed; it was left untouched.
    InputParse,
    /// A ledger record did not match the line it targets; patching was aborted.
    SubstringNotFound,
    /// The patched text no longer parses; it was written anyway.
    ReparseFailure,
    /// A subprocess or the built-in checker failed the validation gate.
    ExternalToolFailure,
    /// Old-style syntax reported by a read-only matcher.
    Syntax,
    /// Informational note from a matcher; never affects the exit code.
    Advisory,
    /// Reading or writing the file failed.
    Io,
}

/// A single message tied to a file and a 1-based line number (0 when not line-specific).
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub path: String,
    pub line: usize,
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    pub fn new(
        path: impl Into<String>,
        line: usize,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self {
            path: path.into(),
            line,
            kind,
            message: message.into(),
        }
    }

    /// Diagnostic for a 0-based tree-sitter row.
    pub fn at_row(
        path: impl Into<String>,
        row: usize,
        kind: DiagnosticKind,
        message: impl Into<String>,
    ) -> Self {
        Self::new(path, row + 1, kind, message)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.line == 0 {
            write!(f, "{}: {}", self.path, self.message)
        } else {
            write!(f, "{}:{}: {}", self.path, self.line, self.message)
        }
    }
}

// ---------------------------------------------------------------------------
// 2. FileState
// ---------------------------------------------------------------------------

/// Lifecycle of one file through the pipeline.
///
/// `Unmodified` is terminal when no edits were proposed. A file that stops at
/// `Matched` had a ledger rejected by the applier and was left untouched.
/// `Patched` is transient: a pass holds it between applying its ledger and
/// reparsing the result, and always leaves as `Verified` or `Failed`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FileState {
    Unmodified,
    Matched,
    Patched,
    Verified,
    Failed,
}

impl FileState {
    /// Combine the states of two consecutive passes over the same file.
    pub fn merge(self, other: FileState) -> FileState {
        self.max(other)
    }
}

// ---------------------------------------------------------------------------
// 3. FileReport
// ---------------------------------------------------------------------------

/// Outcome of the per-file pipeline, returned up to the orchestrator.
#[derive(Clone, Debug, Serialize)]
pub struct FileReport {
    pub path: String,
    pub state: FileState,
    /// Whether new contents were written to disk.
    pub written: bool,
    pub diagnostics: Vec<Diagnostic>,
}

impl FileReport {
    pub fn unmodified(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            state: FileState::Unmodified,
            written: false,
            diagnostics: Vec::new(),
        }
    }
}
