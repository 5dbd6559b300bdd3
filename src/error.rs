//! Error types for the chunker.

use thiserror::Error;

/// Errors produced while configuring or running a chunker.
#[derive(Debug, Error)]
pub enum ChunkerError {
    /// A chunker option is out of range. Not retryable.
    #[error("Invalid chunker configuration: {0}")]
    InvalidConfiguration(String),

    /// The injected tokenizer failed; the whole `chunk()` call is aborted.
    #[error(transparent)]
    Tokenizer(anyhow::Error),

    /// Layered configuration (file + environment) could not be loaded.
    #[error("Failed to load configuration: {0}")]
    Config(#[from] config::ConfigError),
}

impl ChunkerError {
    /// Shorthand for an [`ChunkerError::InvalidConfiguration`].
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidConfiguration(message.into())
    }

    /// Whether this error was raised by configuration validation.
    pub fn is_invalid_configuration(&self) -> bool {
        matches!(self, Self::InvalidConfiguration(_))
    }
}

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, ChunkerError>;
