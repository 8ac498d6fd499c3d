use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Duplicated parser name '{0}'")]
    DuplicateParser(String),
    #[error("Render name '{namespace}' is registered twice in parser '{parser}'")]
    NamespaceCollision { parser: String, namespace: String },
    #[error("Invalid render name '{0}'")]
    InvalidNamespace(String),
    #[error("Numbering accepts either a parent prefix or a start level, not both")]
    ConflictingNumbering,
    #[error("Invalid setting '{key}' for '{renderer}': {reason}")]
    InvalidSetting {
        renderer: String,
        key: String,
        reason: String,
    },
    #[error("Invalid pattern for '{namespace}': {source}")]
    Pattern {
        namespace: String,
        source: regex::Error,
    },
    #[error("Splitter is exhausted")]
    Exhausted,
    #[error("Parser not found: {0}")]
    ParserNotFound(String),
    #[error("Renderer '{renderer}' not found in parser '{parser}'")]
    RendererNotFound { parser: String, renderer: String },
    #[error("Page not found: {0}")]
    PageNotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),
}

pub type Result<T, E = EngineError> = std::result::Result<T, E>;
