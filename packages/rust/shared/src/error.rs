//! Error types for blockpress.
//!
//! Library crates use [`BlockpressError`] via `thiserror`.
//! The CLI wraps this with `color-eyre` for rich diagnostics.

use std::path::PathBuf;

/// Top-level error type for all blockpress operations.
///
/// Only configuration resolution and the content-source fetch are allowed to
/// fail a build. Everything downstream degrades instead of returning one of
/// these.
#[derive(Debug, thiserror::Error)]
pub enum BlockpressError {
    /// Site or collection configuration is missing a required field.
    #[error("config error: {message}")]
    Config { message: String },

    /// The content source could not deliver a block graph.
    #[error("source error: {0}")]
    Source(String),

    /// Malformed JSON/TOML input.
    #[error("parse error: {message}")]
    Parse { message: String },

    /// Network/HTTP error.
    #[error("network error: {0}")]
    Network(String),

    /// Filesystem I/O error.
    #[error("I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Data validation error.
    #[error("validation error: {message}")]
    Validation { message: String },
}

/// Convenience alias used throughout the codebase.
pub type Result<T> = std::result::Result<T, BlockpressError>;

impl BlockpressError {
    /// Create a config error from any displayable message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Create a parse error from any displayable message.
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse {
            message: msg.into(),
        }
    }

    /// Create a validation error from any displayable message.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation {
            message: msg.into(),
        }
    }

    /// Wrap a `std::io::Error` with a path for context.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
