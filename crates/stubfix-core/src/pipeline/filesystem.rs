//! Stub enumeration under the configured roots.

use std::path::{Path, PathBuf};

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::errors::StubfixResult;

/// Gitignore-style denylist anchored at the project root.
pub fn build_denylist(project_root: &Path, patterns: &[String]) -> StubfixResult<Gitignore> {
    let mut builder = GitignoreBuilder::new(project_root);
    for pattern in patterns {
        builder.add_line(None, pattern)?;
    }
    Ok(builder.build()?)
}

/// `/`-separated path of `path` relative to `project_root`.
pub fn relative_path(project_root: &Path, path: &Path) -> String {
    path.strip_prefix(project_root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

/// Every file with `extension` under `roots`, sorted, denylisted paths and
/// their subtrees excluded. Missing roots are skipped.
pub fn enumerate_stubs(
    project_root: &Path,
    roots: &[PathBuf],
    extension: &str,
    exclude: &[String],
) -> StubfixResult<Vec<PathBuf>> {
    let denylist = build_denylist(project_root, exclude)?;
    let is_denied = |path: &Path, is_dir: bool| {
        let rel = path.strip_prefix(project_root).unwrap_or(path);
        denylist.matched(rel, is_dir).is_ignore()
    };

    let mut files = Vec::new();
    for root in roots {
        let root = project_root.join(root);
        if !root.is_dir() {
            warn!(root = %root.display(), "root does not exist, skipping");
            continue;
        }
        let walker = WalkDir::new(&root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| !is_denied(entry.path(), entry.file_type().is_dir()));
        for entry in walker {
            let entry = entry?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == extension)
            {
                files.push(entry.into_path());
            }
        }
    }
    debug!(count = files.len(), "enumerated stubs");
    Ok(files)
}
