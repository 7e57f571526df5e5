//! Error types for the FeedBar ingestion worker.

use thiserror::Error;

/// Common error type for the ingestion worker.
#[derive(Error, Debug)]
pub enum FeedbarError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for configuration or input data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// HTTP client setup error.
    #[error("HTTP client error: {0}")]
    Http(String),
}

impl From<sqlx::Error> for FeedbarError {
    fn from(e: sqlx::Error) -> Self {
        FeedbarError::Database(e.to_string())
    }
}

/// Result type alias for ingestion worker operations.
pub type Result<T> = std::result::Result<T, FeedbarError>;
