//! Custom error types and result handling for Seiri operations.
//!
//! This module defines the error handling system used throughout Seiri.
//! All operations return a [`Result<T>`] which is a type alias for
//! `std::result::Result<T, Error>`.

use std::path::PathBuf;

/// Type alias for Results with Seiri errors.
pub type Result<T> = std::result::Result<T, Error>;

/// Comprehensive error type for all Seiri operations.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// I/O errors from the standard library
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// Async task join errors
    #[error(transparent)]
    Join(#[from] tokio::task::JoinError),
    #[error(transparent)]
    Semaphore(#[from] tokio::sync::AcquireError),
    #[error(transparent)]
    ConfigBuilder(#[from] crate::seiri::SeiriConfigBuilderError),
    /// EPUB reading errors, stringified at the boundary
    #[error("EPUB error: {0}")]
    Epub(String),
    /// Error for invalid file or directory paths
    #[error("The given path '{0:?}' is invalid: {1}")]
    InvalidPath(PathBuf, String),
    /// A reconciliation cycle is already in flight for this library
    #[error("A reconciliation cycle is already running")]
    ScanInProgress,
    /// Duplicate correlation key on insert; indicates a scanner or catalog bug
    #[error("Conflict: {0}")]
    Conflict(String),
    /// Error for resources that couldn't be found (e.g., library root, book record)
    #[error("Not found: {0}")]
    NotFound(String),
    /// Other errors that don't fit into specific categories
    #[error("Other error: {0}")]
    Other(String),
}

// Basic From<String> conversion for convenience
impl From<String> for Error {
    fn from(error: String) -> Self {
        Error::Other(error)
    }
}

impl From<&str> for Error {
    fn from(error: &str) -> Self {
        Error::Other(error.to_string())
    }
}
