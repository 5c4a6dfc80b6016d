//! Error types for Ordne.

use thiserror::Error;

/// Library-level error type for Ordne operations.
#[derive(Error, Debug)]
pub enum OrdneError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Agent stopped after {rounds} rounds without a final answer")]
    RoundLimit { rounds: usize },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Ordne operations.
pub type Result<T> = std::result::Result<T, OrdneError>;
