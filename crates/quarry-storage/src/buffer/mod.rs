//! Buffer Pool Manager for QuarryDB.
//!
//! The buffer pool is the in-memory cache mediating all access between
//! higher-level access methods and the on-disk page store:
//!
//! - **Frames**: a fixed array of page-sized slots with pin counts and
//!   dirty tracking
//! - **Replacement**: LRU eviction of unpinned frames behind a
//!   substitutable [`Replacer`] trait
//! - **Sharding**: a [`ParallelBufferPool`] of independent
//!   [`BufferPoolInstance`]s, routed by `page_id mod N`, each with its
//!   own latch
//! - **Write-back**: dirty victims are written to disk before their
//!   frame is reused
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     ParallelBufferPool                       │
//! │        new_page: rotating cursor   others: id mod N          │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────┐  │
//! │  │  Instance 0    │  │  Instance 1    │  │  Instance N-1  │  │
//! │  │  ───────────   │  │  ───────────   │  │  ───────────   │  │
//! │  │  page table    │  │  page table    │  │  page table    │  │
//! │  │  free list     │  │  free list     │  │  free list     │  │
//! │  │  LRU replacer  │  │  LRU replacer  │  │  LRU replacer  │  │
//! │  │  frames[]      │  │  frames[]      │  │  frames[]      │  │
//! │  └────────────────┘  └────────────────┘  └────────────────┘  │
//! │           │                  │                   │           │
//! │           └────────────── DiskManager ───────────┘           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use quarry_storage::buffer::{BufferPool, BufferPoolConfig, ParallelBufferPool};
//! use quarry_storage::disk::DiskManager;
//! use quarry_common::constants::PAGE_SIZE;
//!
//! fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let disk = Arc::new(DiskManager::open("quarry.db", PAGE_SIZE)?);
//!     let config = BufferPoolConfig::new(1024).with_instances(4);
//!     let pool = ParallelBufferPool::new(&config, disk)?;
//!
//!     let mut guard = pool.new_page_guarded()?;
//!     guard.data_mut()[0..5].copy_from_slice(b"hello");
//!     let page_id = guard.page_id();
//!     drop(guard); // unpins, reporting the page dirty
//!
//!     pool.flush_page(page_id)?;
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod frame;
mod guard;
mod instance;
mod parallel;
mod pool;
mod replacer;

pub use config::BufferPoolConfig;
pub use error::{BufferError, BufferResult};
pub use frame::{BufferFrame, FrameId};
pub use guard::PageGuard;
pub use instance::BufferPoolInstance;
pub use parallel::ParallelBufferPool;
pub use pool::BufferPool;
pub use replacer::{LruReplacer, Replacer};

/// Statistics for buffer pool monitoring.
#[derive(Debug, Clone, Default)]
pub struct BufferPoolStats {
    /// Total number of page fetches.
    pub fetches: u64,
    /// Number of fetches served from memory.
    pub hits: u64,
    /// Number of fetches that required a disk read.
    pub misses: u64,
    /// Number of frames reclaimed from the replacer.
    pub evictions: u64,
    /// Number of page writes (flushes and dirty write-backs).
    pub flushes: u64,
    /// Current number of pinned frames.
    pub pinned_frames: usize,
    /// Current number of dirty frames.
    pub dirty_frames: usize,
}

impl BufferPoolStats {
    /// Returns the cache hit ratio (0.0 to 1.0).
    pub fn hit_ratio(&self) -> f64 {
        if self.fetches == 0 {
            0.0
        } else {
            self.hits as f64 / self.fetches as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_hit_ratio() {
        let mut stats = BufferPoolStats::default();
        assert_eq!(stats.hit_ratio(), 0.0);

        stats.fetches = 10;
        stats.hits = 9;
        assert!((stats.hit_ratio() - 0.9).abs() < f64::EPSILON);
    }
}
