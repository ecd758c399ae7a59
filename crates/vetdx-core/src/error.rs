//! Error types for vetdx

use thiserror::Error;

/// Result type alias using VetDxError
pub type Result<T> = std::result::Result<T, VetDxError>;

/// Error type alias for convenience
pub type Error = VetDxError;

/// Main error type for vetdx
#[derive(Debug, Error)]
pub enum VetDxError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Walk directory error: {0}")]
    WalkDir(#[from] walkdir::Error),

    #[error("Unsupported file extension: {0}")]
    UnsupportedExtension(String),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("External service error: {0}")]
    Provider(String),

    #[error("Not implemented: {0}")]
    NotImplemented(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl VetDxError {
    /// Whether this error class is transient (safe to retry on another provider)
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Provider(_) | Self::Llm(_) | Self::Parse(_)
        )
    }
}
