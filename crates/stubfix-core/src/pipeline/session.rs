//! Run orchestration: enumerate, migrate every file, run the gate, and fold
//! everything into one [`Session`] value.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, warn};

use crate::codemods::{Codemod, CodemodContext, CodemodKind};
use crate::config::{RunSettings, TypeshedConfig};
use crate::errors::StubfixResult;
use crate::models::{Diagnostic, FileReport, FileState};
use crate::pipeline::filesystem::enumerate_stubs;
use crate::pipeline::gate::{check_paths, run_formatters, run_gate};
use crate::pipeline::run::process_file;

/// Everything one invocation needs besides the typeshed configuration.
#[derive(Clone, Debug)]
pub struct RunOptions {
    pub project_root: PathBuf,
    pub settings: RunSettings,
    pub codemods: Vec<CodemodKind>,
    /// Run the configured formatters after patching.
    pub format: bool,
    /// Run the validation gate after patching.
    pub check: bool,
}

impl RunOptions {
    pub fn new(project_root: impl Into<PathBuf>, settings: RunSettings) -> Self {
        Self {
            project_root: project_root.into(),
            settings,
            codemods: CodemodKind::DEFAULT.to_vec(),
            format: true,
            check: true,
        }
    }

    fn files(&self) -> StubfixResult<Vec<PathBuf>> {
        enumerate_stubs(
            &self.project_root,
            &self.settings.roots,
            &self.settings.extension,
            &self.settings.exclude,
        )
    }
}

/// Accumulated outcome of one run.
#[derive(Debug, Default, Serialize)]
pub struct Session {
    pub reports: Vec<FileReport>,
    /// Validation gate failures; empty when the gate passed or did not run.
    pub gate: Vec<Diagnostic>,
}

impl Session {
    pub fn record(&mut self, report: FileReport) {
        self.reports.push(report);
    }

    pub fn merge(&mut self, other: Session) {
        self.reports.extend(other.reports);
        self.gate.extend(other.gate);
    }

    pub fn count(&self, state: FileState) -> usize {
        self.reports.iter().filter(|r| r.state == state).count()
    }

    pub fn written(&self) -> usize {
        self.reports.iter().filter(|r| r.written).count()
    }

    pub fn failed_files(&self) -> Vec<&str> {
        self.reports
            .iter()
            .filter(|r| r.state == FileState::Failed)
            .map(|r| r.path.as_str())
            .collect()
    }

    /// Per-file diagnostics followed by gate failures.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.reports
            .iter()
            .flat_map(|r| r.diagnostics.iter())
            .chain(self.gate.iter())
    }

    pub fn success(&self) -> bool {
        self.gate.is_empty() && self.count(FileState::Failed) == 0
    }

    pub fn exit_code(&self) -> i32 {
        if self.success() {
            0
        } else {
            1
        }
    }

    pub fn render_summary(&self) -> String {
        let mut out = String::new();
        for diagnostic in self.diagnostics() {
            let _ = writeln!(out, "{diagnostic}");
        }
        if !self.reports.is_empty() {
            let _ = writeln!(
                out,
                "{} files processed: {} rewritten, {} verified, {} failed, {} not patched",
                self.reports.len(),
                self.written(),
                self.count(FileState::Verified),
                self.count(FileState::Failed),
                self.count(FileState::Matched),
            );
        }
        let failed = self.failed_files();
        if !failed.is_empty() {
            let _ = writeln!(out, "Patched files that no longer parse:");
            for path in failed {
                let _ = writeln!(out, "  {path}");
            }
        }
        if self.success() {
            out.push_str("Success\n");
        } else {
            let _ = writeln!(out, "Failure: {} gate errors", self.gate.len());
        }
        out
    }
}

/// Migrate `files`, on a rayon pool when `jobs > 1`. Reports come back in
/// file order either way.
fn run_files(
    project_root: &Path,
    files: &[PathBuf],
    codemods: &[Box<dyn Codemod>],
    ctx: &CodemodContext<'_>,
    jobs: usize,
) -> Vec<FileReport> {
    if files.is_empty() {
        return vec![];
    }
    if jobs <= 1 {
        return files
            .iter()
            .map(|path| process_file(project_root, path, codemods, ctx))
            .collect();
    }

    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build();
    match pool {
        Ok(pool) => pool.install(|| {
            files
                .par_iter()
                .map(|path| process_file(project_root, path, codemods, ctx))
                .collect()
        }),
        Err(e) => {
            warn!(error = %e, "thread pool unavailable, running sequentially");
            files
                .iter()
                .map(|path| process_file(project_root, path, codemods, ctx))
                .collect()
        }
    }
}

/// Run the selected codemods over every stub, then formatters and the gate.
pub fn migrate(options: &RunOptions, config: &TypeshedConfig) -> StubfixResult<Session> {
    let started = Instant::now();
    let files = options.files()?;
    let codemods: Vec<Box<dyn Codemod>> = options.codemods.iter().map(|k| k.build()).collect();
    let ctx = CodemodContext { config };
    info!(
        files = files.len(),
        codemods = ?options.codemods,
        jobs = options.settings.jobs,
        "migrating stubs"
    );

    let mut session = Session::default();
    for report in run_files(
        &options.project_root,
        &files,
        &codemods,
        &ctx,
        options.settings.jobs,
    ) {
        session.record(report);
    }

    if options.format {
        session
            .gate
            .extend(run_formatters(&options.project_root, &options.settings.formatters));
    }
    if options.check {
        session.gate.extend(run_gate(
            &options.project_root,
            &options.settings,
            &files,
            config,
        ));
    }
    info!(
        written = session.written(),
        failed = session.count(FileState::Failed),
        gate_errors = session.gate.len(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "migration finished"
    );
    Ok(session)
}

/// Only the built-in syntax checker, over every stub.
pub fn check(options: &RunOptions, config: &TypeshedConfig) -> StubfixResult<Session> {
    let files = options.files()?;
    Ok(Session {
        reports: Vec::new(),
        gate: check_paths(&options.project_root, &files, config),
    })
}
