//! Project configuration read from `pyproject.toml`.
//!
//! `[tool.typeshed]` carries the supported Python range and platforms;
//! `[tool.stubfix]` carries run settings, all of which have defaults.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::errors::{StubfixError, StubfixResult};

static VERSION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^3\.(\d+)$").unwrap());

/// Extract the minor component of a `3.N` version string.
pub fn minor_version_from_version_string(version: &str) -> StubfixResult<u32> {
    let caps = VERSION_RE
        .captures(version.trim())
        .ok_or_else(|| StubfixError::Config(format!("invalid Python version {version:?}")))?;
    caps[1]
        .parse()
        .map_err(|_| StubfixError::Config(format!("invalid Python version {version:?}")))
}

// ---------------------------------------------------------------------------
// [tool.typeshed]
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeshedConfig {
    pub min_supported_version: String,
    pub max_supported_version: String,
    pub supported_platforms: Vec<String>,
    /// `3.max` down to `3.min`, newest first.
    pub supported_versions: Vec<String>,
    min_minor: u32,
}

impl TypeshedConfig {
    pub fn new(
        min_supported_version: &str,
        max_supported_version: &str,
        supported_platforms: Vec<String>,
    ) -> StubfixResult<Self> {
        let min_minor = minor_version_from_version_string(min_supported_version)?;
        let max_minor = minor_version_from_version_string(max_supported_version)?;
        if max_minor < min_minor {
            return Err(StubfixError::Config(format!(
                "max_supported_version {max_supported_version} is older than \
                 min_supported_version {min_supported_version}"
            )));
        }
        let supported_versions = (min_minor..=max_minor)
            .rev()
            .map(|minor| format!("3.{minor}"))
            .collect();
        Ok(Self {
            min_supported_version: min_supported_version.to_string(),
            max_supported_version: max_supported_version.to_string(),
            supported_platforms,
            supported_versions,
            min_minor,
        })
    }

    pub fn minimum_minor_version(&self) -> u32 {
        self.min_minor
    }

    /// Module that provides `TypeAlias` on every supported version.
    pub fn type_alias_module(&self) -> &'static str {
        if self.min_minor >= 10 {
            "typing"
        } else {
            "typing_extensions"
        }
    }
}

impl Default for TypeshedConfig {
    fn default() -> Self {
        Self {
            min_supported_version: "3.7".to_string(),
            max_supported_version: "3.11".to_string(),
            supported_platforms: vec![
                "linux".to_string(),
                "win32".to_string(),
                "darwin".to_string(),
            ],
            supported_versions: (7..=11).rev().map(|minor| format!("3.{minor}")).collect(),
            min_minor: 7,
        }
    }
}

// ---------------------------------------------------------------------------
// [tool.stubfix]
// ---------------------------------------------------------------------------

/// Run settings; every key is optional in the file.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunSettings {
    pub roots: Vec<PathBuf>,
    /// Gitignore-style patterns, relative to the project root.
    pub exclude: Vec<String>,
    pub extension: String,
    /// Commands run after patching, e.g. `[["isort", "."], ["black", "."]]`.
    pub formatters: Vec<Vec<String>>,
    /// External validation script; a nonzero exit fails the run.
    pub validator: Option<Vec<String>>,
    /// flake8-style linter emitting `--format json` output on stdout.
    pub linter: Option<Vec<String>>,
    pub jobs: usize,
}

impl Default for RunSettings {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from("stdlib"), PathBuf::from("stubs")],
            exclude: vec!["@python2".to_string()],
            extension: "pyi".to_string(),
            formatters: Vec::new(),
            validator: None,
            linter: None,
            jobs: 1,
        }
    }
}

// ---------------------------------------------------------------------------
// File loading
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct PyProject {
    tool: Option<ToolTable>,
}

#[derive(Deserialize)]
struct ToolTable {
    typeshed: Option<RawTypeshed>,
    stubfix: Option<RunSettings>,
}

#[derive(Deserialize)]
struct RawTypeshed {
    min_supported_version: String,
    max_supported_version: String,
    supported_platforms: Vec<String>,
}

/// Everything read from one `pyproject.toml`.
#[derive(Clone, Debug)]
pub struct ProjectConfig {
    pub typeshed: TypeshedConfig,
    pub settings: RunSettings,
}

impl ProjectConfig {
    pub fn from_toml_str(content: &str) -> StubfixResult<Self> {
        let parsed: PyProject = toml::from_str(content)?;
        let tool = parsed
            .tool
            .ok_or_else(|| StubfixError::Config("missing [tool] table".to_string()))?;
        let raw = tool
            .typeshed
            .ok_or_else(|| StubfixError::Config("missing [tool.typeshed] table".to_string()))?;
        Ok(Self {
            typeshed: TypeshedConfig::new(
                &raw.min_supported_version,
                &raw.max_supported_version,
                raw.supported_platforms,
            )?,
            settings: tool.stubfix.unwrap_or_default(),
        })
    }

    pub fn load(path: &Path) -> StubfixResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StubfixError::Config(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&content)
    }
}
