//! Error types for the agent.

use thiserror::Error;

/// Library-level error type for agent operations.
#[derive(Error, Debug)]
pub enum GaiaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Model backend error: {0}")]
    Backend(String),

    #[error("File ingestion failed: {0}")]
    Ingestion(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for agent operations.
pub type Result<T> = std::result::Result<T, GaiaError>;
