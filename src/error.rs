//! Top-level error type for naksha

use crate::config::ConfigError;
use crate::io::{LoadError, StreamError};

/// Result type alias
pub type Result<T> = std::result::Result<T, MapBuilderError>;

/// Errors surfaced by [`MapBuilder`](crate::engine::MapBuilder) operations
#[derive(Debug, thiserror::Error)]
pub enum MapBuilderError {
    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Persisted stream could not be written or read
    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    /// Persisted state is inconsistent
    #[error("Load error: {0}")]
    Load(#[from] LoadError),
}

impl MapBuilderError {
    /// Whether the error means corrupt input or misuse rather than a
    /// condition the caller can work around.
    pub fn is_fatal(&self) -> bool {
        match self {
            MapBuilderError::Config(e) => e.is_fatal(),
            MapBuilderError::Stream(e) => e.is_fatal(),
            MapBuilderError::Load(e) => e.is_fatal(),
        }
    }
}
