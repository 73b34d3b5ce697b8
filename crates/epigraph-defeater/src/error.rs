//! Error types for defeater operations

use std::fmt::Display;
use thiserror::Error;

/// Errors that can occur during defeater operations
#[derive(Error, Debug)]
pub enum DefeaterError {
    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Detection context carried an unparseable timestamp
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A provider was reported unavailable
    #[error("Provider unavailable: {provider}")]
    ProviderUnavailable {
        /// Provider name as reported in the detection context
        provider: String,
    },

    /// A contradiction was resolved without a resolution
    #[error("Resolution required")]
    ResolutionRequired,

    /// Referenced defeater, claim or contradiction does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Worker error (tokio runtime issues)
    #[error("Worker error: {0}")]
    Worker(String),
}

impl DefeaterError {
    pub(crate) fn store(err: impl Display) -> Self {
        DefeaterError::Store(err.to_string())
    }
}
