//! Error types for the liftlog_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for liftlog_core operations
///
/// Nothing in this crate retries on error: every variant is terminal for the
/// request that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Malformed or out-of-range input at the request boundary
    #[error("Validation error: {0}")]
    Validation(String),

    /// No exercise matches the requested name
    #[error("Not found: {0}")]
    NotFound(String),

    /// The definitions table is missing a column we depend on
    #[error("Schema error: {0}")]
    Schema(String),

    /// Stored progression data is corrupt or the engine left its step table
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Underlying persistence failure
    #[error("Store error: {0}")]
    Store(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Seed catalog validation error
    #[error("Catalog validation error: {0}")]
    CatalogValidation(String),
}

impl Error {
    /// True for failures of the persistence layer (including raw IO, codec and TOML errors)
    pub fn is_store_failure(&self) -> bool {
        matches!(
            self,
            Error::Store(_) | Error::Io(_) | Error::Json(_) | Error::Csv(_) | Error::Toml(_)
        )
    }
}
