//! The per-file pipeline: plan, apply, reparse, fix up, write.
//!
//! Every failure inside one file ends up as a [`Diagnostic`] on that file's
//! [`FileReport`]; nothing here aborts the batch.

use std::path::Path;

use tracing::{debug, info, warn};

use crate::codemods::{Codemod, CodemodContext};
use crate::models::{Diagnostic, DiagnosticKind, FileReport, FileState};
use crate::patch::apply;
use crate::pipeline::filesystem::relative_path;
use crate::syntax::{join_lines, SourceFile};

/// Result of one codemod over one file.
#[derive(Debug)]
pub struct PassOutcome {
    pub state: FileState,
    /// New contents when the ledger applied cleanly.
    pub lines: Option<Vec<String>>,
    pub diagnostics: Vec<Diagnostic>,
}

fn reparse_failure(rel_path: &str, reparsed: Option<&SourceFile>, stage: &str) -> Diagnostic {
    let row = reparsed.and_then(SourceFile::first_error_row).unwrap_or(0);
    Diagnostic::at_row(
        rel_path,
        row,
        DiagnosticKind::ReparseFailure,
        format!("patched text does not parse after {stage}"),
    )
}

/// Run one codemod against `file`: plan, apply, reparse and, when the
/// reparse succeeds, the codemod's fix-up pass.
///
/// The returned state is `Unmodified`, `Matched` (a ledger was rejected and
/// nothing may be written), `Verified` or `Failed`; `Patched` only holds
/// between applying the ledger and reparsing it.
pub fn run_pass(codemod: &dyn Codemod, file: &SourceFile, ctx: &CodemodContext<'_>) -> PassOutcome {
    let rel_path = file.rel_path.as_str();
    let plan = codemod.plan(file, ctx);
    let mut diagnostics = plan.diagnostics.clone();
    if plan.ledger.is_empty() {
        return PassOutcome {
            state: FileState::Unmodified,
            lines: None,
            diagnostics,
        };
    }
    debug!(
        path = rel_path,
        codemod = codemod.name(),
        patches = plan.ledger.patch_count(),
        insertions = plan.ledger.insertions().len(),
        "matched"
    );

    let mut state = FileState::Matched;
    let patched = match apply(&file.lines, &plan.ledger) {
        Ok(lines) => {
            state = FileState::Patched;
            lines
        }
        Err(e) => {
            warn!(path = rel_path, codemod = codemod.name(), error = %e, "patching aborted");
            diagnostics.push(Diagnostic::new(
                rel_path,
                0,
                DiagnosticKind::SubstringNotFound,
                format!("{}: {e}", codemod.name()),
            ));
            return PassOutcome {
                state,
                lines: None,
                diagnostics,
            };
        }
    };
    debug!(path = rel_path, codemod = codemod.name(), state = ?state, "reparsing");

    let reparsed = match SourceFile::from_lines(rel_path, &patched) {
        Ok(reparsed) if reparsed.is_valid() => reparsed,
        other => {
            warn!(path = rel_path, codemod = codemod.name(), "reparse failed");
            diagnostics.push(reparse_failure(rel_path, other.as_ref().ok(), codemod.name()));
            return PassOutcome {
                state: FileState::Failed,
                lines: Some(patched),
                diagnostics,
            };
        }
    };

    let fix = codemod.fixup(&reparsed, &plan, ctx);
    if fix.is_empty() {
        return PassOutcome {
            state: FileState::Verified,
            lines: Some(patched),
            diagnostics,
        };
    }
    let fixed = match apply(&reparsed.lines, &fix) {
        Ok(lines) => lines,
        Err(e) => {
            warn!(path = rel_path, error = %e, "fix-up aborted");
            diagnostics.push(Diagnostic::new(
                rel_path,
                0,
                DiagnosticKind::SubstringNotFound,
                format!("{} fix-up: {e}", codemod.name()),
            ));
            return PassOutcome {
                state: FileState::Matched,
                lines: None,
                diagnostics,
            };
        }
    };
    let state = match SourceFile::from_lines(rel_path, &fixed) {
        Ok(checked) if checked.is_valid() => FileState::Verified,
        other => {
            warn!(path = rel_path, "fix-up output does not parse");
            let stage = format!("{} fix-up", codemod.name());
            diagnostics.push(reparse_failure(rel_path, other.as_ref().ok(), &stage));
            FileState::Failed
        }
    };
    PassOutcome {
        state,
        lines: Some(fixed),
        diagnostics,
    }
}

/// Outcome of all codemods over one file's text.
#[derive(Debug)]
pub struct Migration {
    pub state: FileState,
    /// New file contents; `None` when the text is unchanged.
    pub output: Option<String>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Chain `codemods` over `text` in memory. Each pass plans against the
/// previous pass's output; a pass that leaves unparsable text stops the chain,
/// and a rejected ledger in any pass discards every pass's edits.
pub fn migrate_source(
    rel_path: &str,
    text: &str,
    codemods: &[Box<dyn Codemod>],
    ctx: &CodemodContext<'_>,
) -> Migration {
    let mut diagnostics = Vec::new();
    let mut file = match SourceFile::parse(rel_path, text) {
        Ok(file) if file.is_valid() => file,
        other => {
            let row = other
                .as_ref()
                .ok()
                .and_then(SourceFile::first_error_row)
                .unwrap_or(0);
            warn!(path = rel_path, "input does not parse, skipping");
            diagnostics.push(Diagnostic::at_row(
                rel_path,
                row,
                DiagnosticKind::InputParse,
                "input does not parse; file left untouched",
            ));
            return Migration {
                state: FileState::Unmodified,
                output: None,
                diagnostics,
            };
        }
    };

    let mut state = FileState::Unmodified;
    let mut current: Option<Vec<String>> = None;
    for codemod in codemods {
        let outcome = run_pass(codemod.as_ref(), &file, ctx);
        diagnostics.extend(outcome.diagnostics);
        if outcome.state == FileState::Matched {
            warn!(path = rel_path, codemod = codemod.name(), "file left untouched");
            return Migration {
                state: FileState::Matched,
                output: None,
                diagnostics,
            };
        }
        state = state.merge(outcome.state);
        let Some(lines) = outcome.lines else {
            continue;
        };
        if outcome.state == FileState::Failed {
            current = Some(lines);
            break;
        }
        match SourceFile::from_lines(rel_path, &lines) {
            Ok(next) => file = next,
            Err(e) => {
                warn!(path = rel_path, error = %e, "reparse failed");
                current = Some(lines);
                break;
            }
        }
        current = Some(lines);
    }

    let output = current
        .map(|lines| join_lines(&lines))
        .filter(|output| output != text);
    Migration {
        state,
        output,
        diagnostics,
    }
}

/// Read, migrate and, when the text changed, rewrite one file.
pub fn process_file(
    project_root: &Path,
    path: &Path,
    codemods: &[Box<dyn Codemod>],
    ctx: &CodemodContext<'_>,
) -> FileReport {
    let rel_path = relative_path(project_root, path);
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            let mut report = FileReport::unmodified(&rel_path);
            report.diagnostics.push(Diagnostic::new(
                &rel_path,
                0,
                DiagnosticKind::Io,
                format!("failed to read: {e}"),
            ));
            return report;
        }
    };

    let migration = migrate_source(&rel_path, &text, codemods, ctx);
    let mut report = FileReport {
        path: rel_path,
        state: migration.state,
        written: false,
        diagnostics: migration.diagnostics,
    };
    if let Some(output) = migration.output {
        match std::fs::write(path, output) {
            Ok(()) => {
                report.written = true;
                info!(path = %report.path, state = ?report.state, "rewrote stub");
            }
            Err(e) => report.diagnostics.push(Diagnostic::new(
                &report.path,
                0,
                DiagnosticKind::Io,
                format!("failed to write: {e}"),
            )),
        }
    }
    report
}
