//! Disk manager errors.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Result type for disk manager operations.
pub type DiskResult<T> = Result<T, DiskError>;

/// Errors that can occur during page-file I/O.
#[derive(Debug, Error)]
pub enum DiskError {
    /// Failed to open the database file.
    #[error("failed to open {path}: {source}")]
    Open {
        /// Path of the file that could not be opened.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// I/O error while reading or writing a page.
    #[error("I/O error: {source}")]
    Io {
        /// Underlying I/O error.
        #[from]
        source: io::Error,
    },
}

impl DiskError {
    /// Creates an open error with path context.
    pub fn open(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Open {
            path: path.into(),
            source,
        }
    }
}
