//! Buffer pool errors.

use thiserror::Error;

use quarry_common::types::PageId;

use crate::disk::DiskError;

/// Result type for buffer pool operations.
pub type BufferResult<T> = Result<T, BufferError>;

/// Errors that can occur during buffer pool operations.
#[derive(Debug, Error)]
pub enum BufferError {
    /// No frame can be made available: every frame is pinned.
    #[error("no evictable frame available, all pages are pinned")]
    PoolExhausted,

    /// The page is not resident in the buffer pool.
    #[error("page {page_id} is not resident in the buffer pool")]
    PageNotResident {
        /// The page that was requested.
        page_id: PageId,
    },

    /// Unpin was called on a page with no outstanding pins.
    #[error("page {page_id} has no outstanding pins")]
    NotPinned {
        /// The page that was over-unpinned.
        page_id: PageId,
    },

    /// Delete was called on a page that is still pinned.
    #[error("page {page_id} is pinned ({pin_count} outstanding) and cannot be deleted")]
    PagePinned {
        /// The page that was requested for deletion.
        page_id: PageId,
        /// Number of outstanding pins at the time of the call.
        pin_count: u32,
    },

    /// Disk I/O failed during a read, write-back, or flush.
    #[error("disk I/O failed: {source}")]
    Disk {
        /// Underlying disk error.
        #[from]
        source: DiskError,
    },

    /// Configuration error.
    #[error("configuration error: {message}")]
    Config {
        /// What was wrong with the configuration.
        message: String,
    },
}

impl BufferError {
    /// Creates a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a page-not-resident error.
    pub fn not_resident(page_id: PageId) -> Self {
        Self::PageNotResident { page_id }
    }

    /// Returns true if this is a transient error that can be retried
    /// after other callers release their pins.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::PoolExhausted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_construction() {
        let err = BufferError::not_resident(PageId::new(42));
        assert!(matches!(
            err,
            BufferError::PageNotResident { page_id } if page_id == PageId::new(42)
        ));
    }

    #[test]
    fn test_is_retryable() {
        assert!(BufferError::PoolExhausted.is_retryable());
        assert!(!BufferError::not_resident(PageId::new(1)).is_retryable());
        assert!(!BufferError::config("bad").is_retryable());
    }

    #[test]
    fn test_display() {
        let err = BufferError::PagePinned {
            page_id: PageId::new(9),
            pin_count: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains('9'));
        assert!(msg.contains('2'));
    }
}
