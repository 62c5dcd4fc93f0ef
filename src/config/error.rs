//! Configuration errors.

use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Configuration load or validation error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// I/O error while reading a config file
    #[error("I/O error: {0}")]
    Io(String),

    /// YAML parse error
    #[error("Parse error: {0}")]
    Parse(String),

    /// Not exactly one of the 2D/3D mode flags is set
    #[error(
        "Exactly one of use_trajectory_builder_2d ({two_d}) and use_trajectory_builder_3d ({three_d}) must be set"
    )]
    AmbiguousMode {
        /// Value of the 2D flag
        two_d: bool,
        /// Value of the 3D flag
        three_d: bool,
    },

    /// Value out of its valid range
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ConfigError {
    /// Configuration errors always stop construction.
    pub fn is_fatal(&self) -> bool {
        true
    }
}
