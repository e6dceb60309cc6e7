//! Error types for the stubfix core library.

/// Top-level error enum for the stubfix core library.
#[derive(Debug, thiserror::Error)]
pub enum StubfixError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("line {line}: expected `{old}` in `{current}`")]
    SubstringNotFound {
        line: usize,
        old: String,
        current: String,
    },

    #[error("External tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Walk error: {0}")]
    Walk(#[from] walkdir::Error),

    #[error("Ignore pattern error: {0}")]
    Ignore(#[from] ignore::Error),
}

pub type StubfixResult<T> = Result<T, StubfixError>;
