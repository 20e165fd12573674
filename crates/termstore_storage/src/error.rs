//! Error types for storage operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Attempted to read beyond the end of the log.
    #[error("read beyond end of log: offset {offset}, len {len}, size {size}")]
    ReadPastEnd {
        /// The requested read offset.
        offset: u64,
        /// The requested read length.
        len: usize,
        /// The current log size.
        size: u64,
    },

    /// Attempted to truncate the log to a size larger than it is.
    #[error("cannot truncate log of size {size} to {requested}")]
    InvalidTruncate {
        /// The requested size.
        requested: u64,
        /// The current log size.
        size: u64,
    },

    /// Another handle already holds the log's lock file.
    #[error("log is locked by another handle: {}", path.display())]
    Locked {
        /// The lock file that could not be acquired.
        path: PathBuf,
    },
}
