//! Post-migration validation: formatters, external validator and linter,
//! then the built-in syntax checker.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::config::{RunSettings, TypeshedConfig};
use crate::matchers::{find_misordered_branches, find_old_unions, find_version_check_errors};
use crate::models::{Diagnostic, DiagnosticKind};
use crate::pipeline::external::{parse_lint_report, run_tool_or_failure};
use crate::pipeline::filesystem::relative_path;
use crate::syntax::SourceFile;

/// Built-in checks over one parsed stub.
pub fn check_file(file: &SourceFile, config: &TypeshedConfig) -> Vec<Diagnostic> {
    let mut diagnostics = find_old_unions(file);
    diagnostics.extend(find_misordered_branches(file));
    diagnostics.extend(find_version_check_errors(
        file,
        config.minimum_minor_version(),
    ));
    diagnostics
}

/// Built-in checks over every file in `files`.
pub fn check_paths(
    project_root: &Path,
    files: &[PathBuf],
    config: &TypeshedConfig,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for path in files {
        let rel_path = relative_path(project_root, path);
        let parsed = std::fs::read_to_string(path)
            .map_err(|e| e.to_string())
            .and_then(|text| SourceFile::parse(&rel_path, &text).map_err(|e| e.to_string()));
        match parsed {
            Ok(file) if file.is_valid() => diagnostics.extend(check_file(&file, config)),
            Ok(file) => diagnostics.push(Diagnostic::at_row(
                &rel_path,
                file.first_error_row().unwrap_or(0),
                DiagnosticKind::Syntax,
                "file does not parse",
            )),
            Err(message) => diagnostics.push(Diagnostic::new(
                &rel_path,
                0,
                DiagnosticKind::Io,
                message,
            )),
        }
    }
    debug!(files = files.len(), errors = diagnostics.len(), "built-in check finished");
    diagnostics
}

/// Run each formatter command; failures are returned as gate diagnostics.
pub fn run_formatters(project_root: &Path, formatters: &[Vec<String>]) -> Vec<Diagnostic> {
    formatters
        .iter()
        .filter_map(|argv| run_tool_or_failure(argv, project_root).failure())
        .collect()
}

fn run_linter(project_root: &Path, argv: &[String]) -> Vec<Diagnostic> {
    let run = run_tool_or_failure(argv, project_root);
    match parse_lint_report(&run.stdout) {
        Ok(errors) if !errors.is_empty() => errors,
        Ok(_) => run.failure().into_iter().collect(),
        Err(e) => {
            warn!(command = %run.command, error = %e, "unreadable linter output");
            let mut diagnostics: Vec<Diagnostic> = run.failure().into_iter().collect();
            diagnostics.push(Diagnostic::new(
                run.command.clone(),
                0,
                DiagnosticKind::ExternalToolFailure,
                format!("unreadable output: {e}"),
            ));
            diagnostics
        }
    }
}

/// The validation gate after patching. An empty result means it passed.
pub fn run_gate(
    project_root: &Path,
    settings: &RunSettings,
    files: &[PathBuf],
    config: &TypeshedConfig,
) -> Vec<Diagnostic> {
    let mut failures = Vec::new();
    if let Some(argv) = &settings.validator {
        failures.extend(run_tool_or_failure(argv, project_root).failure());
    }
    if let Some(argv) = &settings.linter {
        failures.extend(run_linter(project_root, argv));
    }
    failures.extend(check_paths(project_root, files, config).into_iter().map(|mut d| {
        d.kind = DiagnosticKind::ExternalToolFailure;
        d
    }));
    failures
}
