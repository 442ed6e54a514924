//! Configuration errors.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for configuration loading
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors raised while loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        /// File path
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// The file content did not deserialize
    #[error("failed to parse {path}: {message}")]
    Parse {
        /// File path
        path: PathBuf,
        /// Parser message
        message: String,
    },

    /// The file extension is not `.toml`, `.yaml` or `.yml`
    #[error("unsupported configuration format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A loaded value is invalid
    #[error("invalid configuration: {0}")]
    Validation(String),
}
