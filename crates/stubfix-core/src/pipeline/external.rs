//! Blocking subprocess calls for formatters, validators and linters.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::{debug, warn};

use crate::errors::{StubfixError, StubfixResult};
use crate::models::{Diagnostic, DiagnosticKind};

/// Captured result of one external command.
#[derive(Clone, Debug)]
pub struct ToolRun {
    pub command: String,
    /// `None` when the process was killed by a signal.
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl ToolRun {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Gate diagnostic for a failed run.
    pub fn failure(&self) -> Option<Diagnostic> {
        if self.success() {
            return None;
        }
        let status = match self.code {
            Some(code) => format!("exit status {code}"),
            None => "terminated by signal".to_string(),
        };
        let mut message = format!("failed with {status}");
        let detail = self.stderr.trim();
        if !detail.is_empty() {
            message.push_str(": ");
            message.push_str(detail.lines().next().unwrap_or(detail));
        }
        Some(Diagnostic::new(
            self.command.clone(),
            0,
            DiagnosticKind::ExternalToolFailure,
            message,
        ))
    }
}

/// Run `argv` in `cwd` and wait for it.
pub fn run_tool(argv: &[String], cwd: &Path) -> StubfixResult<ToolRun> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| StubfixError::Tool("empty command".to_string()))?;
    let command = argv.join(" ");
    debug!(command = %command, cwd = %cwd.display(), "running external tool");
    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .output()
        .map_err(|e| StubfixError::Tool(format!("failed to run `{command}`: {e}")))?;
    let run = ToolRun {
        command,
        code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    };
    if !run.success() {
        warn!(command = %run.command, code = ?run.code, "external tool failed");
    }
    Ok(run)
}

/// Run `argv`, folding launch errors into a failed [`ToolRun`].
pub fn run_tool_or_failure(argv: &[String], cwd: &Path) -> ToolRun {
    run_tool(argv, cwd).unwrap_or_else(|e| {
        warn!(error = %e, "external tool could not be started");
        ToolRun {
            command: argv.join(" "),
            code: None,
            stdout: String::new(),
            stderr: e.to_string(),
        }
    })
}

// ---------------------------------------------------------------------------
// flake8 JSON output
// ---------------------------------------------------------------------------

/// One entry of flake8's `--format json` report.
#[derive(Clone, Debug, Deserialize)]
pub struct LintError {
    pub code: String,
    pub filename: String,
    pub line_number: usize,
    #[serde(default)]
    pub column_number: usize,
    pub text: String,
}

/// Parse a `{filename: [error, ...]}` report into diagnostics, in file order.
pub fn parse_lint_report(stdout: &str) -> StubfixResult<Vec<Diagnostic>> {
    if stdout.trim().is_empty() {
        return Ok(Vec::new());
    }
    let report: BTreeMap<String, Vec<LintError>> = serde_json::from_str(stdout)?;
    Ok(report
        .into_values()
        .flatten()
        .map(|error| {
            Diagnostic::new(
                error.filename.trim_start_matches("./"),
                error.line_number,
                DiagnosticKind::ExternalToolFailure,
                format!("{} {}", error.code, error.text),
            )
        })
        .collect())
}
