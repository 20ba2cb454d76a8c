//! Error handling module for CutStream

use thiserror::Error;

use crate::domain::errors::DomainError;

/// Main error type for CutStream operations
#[derive(Error, Debug)]
pub enum CutStreamError {
    /// Invalid or inconsistent configuration value
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Config file could not be parsed
    #[error("Failed to parse config file {path}: {source}")]
    ConfigParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    /// Backend base URL is malformed
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Subscriber could not be installed
    #[error("Failed to initialize logging: {message}")]
    Logging { message: String },

    /// Streaming, playback or backend failure
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl CutStreamError {
    pub fn config(message: impl Into<String>) -> Self {
        CutStreamError::Config {
            message: message.into(),
        }
    }
}

/// Result type alias for CutStream operations
pub type CutStreamResult<T> = std::result::Result<T, CutStreamError>;
