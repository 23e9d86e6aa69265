//! Sharded buffer pool front.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use quarry_common::types::PageId;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::BufferFrame;
use super::instance::BufferPoolInstance;
use super::pool::BufferPool;
use super::BufferPoolStats;
use crate::disk::DiskManager;

/// A buffer pool sharded into independent instances.
///
/// Every operation on an existing page routes to the instance named by
/// `page_id mod num_instances`; since each instance allocates only ids
/// in its own residue class, repeated operations on the same page are
/// serialized by that instance's latch. `new_page` is the exception: it
/// probes instances round-robin from a rotating cursor so allocation
/// load spreads across shards even when one shard is temporarily full.
pub struct ParallelBufferPool {
    /// The pool shards.
    instances: Vec<BufferPoolInstance>,
    /// Where the next `new_page` starts probing. Advisory only; relaxed
    /// ordering is sufficient.
    start_index: AtomicUsize,
    /// Frames per instance.
    instance_pool_size: usize,
}

impl ParallelBufferPool {
    /// Creates a parallel pool of `config.num_instances` shards over a
    /// shared disk manager.
    pub fn new(config: &BufferPoolConfig, disk: Arc<DiskManager>) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;

        let instances = (0..config.num_instances)
            .map(|i| BufferPoolInstance::new(config, i, Arc::clone(&disk)))
            .collect::<BufferResult<Vec<_>>>()?;

        Ok(Self {
            instances,
            start_index: AtomicUsize::new(0),
            instance_pool_size: config.pool_size,
        })
    }

    /// Returns the number of instances.
    pub fn num_instances(&self) -> usize {
        self.instances.len()
    }

    /// Returns the instance responsible for `page_id`.
    fn instance_for(&self, page_id: PageId) -> &BufferPoolInstance {
        &self.instances[page_id.shard_of(self.instances.len())]
    }

    /// Returns statistics aggregated across all instances.
    pub fn stats(&self) -> BufferPoolStats {
        let mut total = BufferPoolStats::default();
        for instance in &self.instances {
            let s = instance.stats();
            total.fetches += s.fetches;
            total.hits += s.hits;
            total.misses += s.misses;
            total.evictions += s.evictions;
            total.flushes += s.flushes;
            total.pinned_frames += s.pinned_frames;
            total.dirty_frames += s.dirty_frames;
        }
        total
    }
}

impl BufferPool for ParallelBufferPool {
    fn new_page(&self) -> BufferResult<Arc<BufferFrame>> {
        let num_instances = self.instances.len();
        let start = self.start_index.load(Ordering::Relaxed);

        for i in 0..num_instances {
            let idx = (start + i) % num_instances;
            match self.instances[idx].new_page() {
                Ok(frame) => {
                    self.start_index.store((idx + 1) % num_instances, Ordering::Relaxed);
                    return Ok(frame);
                }
                Err(BufferError::PoolExhausted) => continue,
                Err(e) => return Err(e),
            }
        }

        self.start_index.store((start + 1) % num_instances, Ordering::Relaxed);
        Err(BufferError::PoolExhausted)
    }

    fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>> {
        self.instance_for(page_id).fetch_page(page_id)
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        self.instance_for(page_id).unpin_page(page_id, is_dirty)
    }

    fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        self.instance_for(page_id).flush_page(page_id)
    }

    fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        self.instance_for(page_id).delete_page(page_id)
    }

    fn flush_all_pages(&self) -> BufferResult<()> {
        for instance in &self.instances {
            instance.flush_all_pages()?;
        }
        Ok(())
    }

    fn pool_size(&self) -> usize {
        self.instances.len() * self.instance_pool_size
    }
}

impl std::fmt::Debug for ParallelBufferPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelBufferPool")
            .field("num_instances", &self.instances.len())
            .field("instance_pool_size", &self.instance_pool_size)
            .field("start_index", &self.start_index.load(Ordering::Relaxed))
            .finish()
    }
}
