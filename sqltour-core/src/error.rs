/// Structured error types for sqltour-core.
///
/// Uses `thiserror` so the store crate can wrap these with `#[from]`.
/// The binary crate (sqltour-cli) still uses `anyhow` for convenience.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for sqltour-core operations
#[derive(Error, Debug)]
pub enum TourError {
    /// I/O operation failed
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    /// Config file could not be parsed
    #[error("Invalid config file {path:?}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// Configuration error
    #[error("Configuration error: {reason}")]
    Config { reason: String },

    /// Store URL names a dialect we cannot talk to
    #[error("Unknown store dialect '{scheme}' in URL")]
    UnknownDialect { scheme: String },

    /// Schema declaration is inconsistent
    #[error("Schema error in table '{table}': {reason}")]
    Schema { table: String, reason: String },

    /// Invalid timestamp format
    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },

    /// A relationship was read before it was loaded inside a scope
    #[error("Detached access: {entity}.{relation} was not loaded inside a scope")]
    DetachedAccess {
        entity: &'static str,
        relation: &'static str,
    },
}

/// Result type alias for sqltour-core operations
pub type Result<T> = std::result::Result<T, TourError>;

impl TourError {
    /// Create a config error
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Create a schema error for a table
    pub fn schema(table: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Schema {
            table: table.into(),
            reason: reason.into(),
        }
    }

    /// Create an invalid timestamp error
    pub fn invalid_timestamp(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidTimestamp {
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a detached access error
    pub fn detached(entity: &'static str, relation: &'static str) -> Self {
        Self::DetachedAccess { entity, relation }
    }
}
