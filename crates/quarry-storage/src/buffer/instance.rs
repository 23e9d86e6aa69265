//! A single buffer pool instance (one shard of the parallel pool).

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, trace};

use quarry_common::constants::PAGE_SIZE;
use quarry_common::types::PageId;

use super::config::BufferPoolConfig;
use super::error::{BufferError, BufferResult};
use super::frame::{BufferFrame, FrameId};
use super::pool::BufferPool;
use super::replacer::{LruReplacer, Replacer};
use super::BufferPoolStats;
use crate::disk::DiskManager;

/// An all-zero page image, written to reserve a fresh page's disk slot.
const ZERO_PAGE: [u8; PAGE_SIZE] = [0u8; PAGE_SIZE];

/// Mutable pool bookkeeping, guarded by the instance latch.
struct PoolState {
    /// Page table: maps resident `PageId` -> `FrameId`.
    page_table: HashMap<PageId, FrameId>,
    /// Frames holding no live page.
    free_list: VecDeque<FrameId>,
    /// Eviction candidates among resident, unpinned frames.
    replacer: Box<dyn Replacer>,
    /// Next page id to hand out; advances by `num_instances`.
    next_page_id: u64,
}

/// One shard of the buffer pool.
///
/// Owns a fixed array of page frames, a free list, a page table, and a
/// replacer, all guarded by a single latch. Every public operation
/// acquires the latch for its full duration - including any disk I/O it
/// needs - so operations on one instance linearize in latch-acquisition
/// order. Instance *i* of *N* allocates page ids from the residue class
/// `i mod N`, which is what lets the parallel pool route by
/// `page_id mod N`.
pub struct BufferPoolInstance {
    /// Index of this instance within the parallel pool.
    instance_index: usize,
    /// Total number of instances in the parallel pool.
    num_instances: usize,
    /// Number of frames owned by this instance.
    pool_size: usize,
    /// The frame array; fixed for the instance's lifetime.
    frames: Vec<Arc<BufferFrame>>,
    /// The instance latch.
    state: Mutex<PoolState>,
    /// Disk manager shared with sibling instances.
    disk: Arc<DiskManager>,
    /// Fetch counter for statistics.
    fetch_count: AtomicU64,
    /// Hit counter for statistics.
    hit_count: AtomicU64,
    /// Miss counter for statistics.
    miss_count: AtomicU64,
    /// Eviction counter for statistics.
    eviction_count: AtomicU64,
    /// Flush counter for statistics.
    flush_count: AtomicU64,
}

impl BufferPoolInstance {
    /// Creates instance `instance_index` of a pool configured by
    /// `config`.
    pub fn new(
        config: &BufferPoolConfig,
        instance_index: usize,
        disk: Arc<DiskManager>,
    ) -> BufferResult<Self> {
        config.validate().map_err(BufferError::config)?;
        if instance_index >= config.num_instances {
            return Err(BufferError::config(format!(
                "instance index {instance_index} out of range for {} instances",
                config.num_instances
            )));
        }

        let pool_size = config.pool_size;
        let frames: Vec<Arc<BufferFrame>> = (0..pool_size)
            .map(|i| Arc::new(BufferFrame::new(FrameId::new(i), PAGE_SIZE)))
            .collect();

        // Initially, every frame is in the free list.
        let free_list: VecDeque<FrameId> = (0..pool_size).map(FrameId::new).collect();

        Ok(Self {
            instance_index,
            num_instances: config.num_instances,
            pool_size,
            frames,
            state: Mutex::new(PoolState {
                page_table: HashMap::with_capacity(pool_size),
                free_list,
                replacer: Box::new(LruReplacer::new(pool_size)),
                next_page_id: instance_index as u64,
            }),
            disk,
            fetch_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            miss_count: AtomicU64::new(0),
            eviction_count: AtomicU64::new(0),
            flush_count: AtomicU64::new(0),
        })
    }

    /// Creates a standalone, unsharded instance owning the whole page-id
    /// space.
    pub fn standalone(pool_size: usize, disk: Arc<DiskManager>) -> BufferResult<Self> {
        let config = BufferPoolConfig::new(pool_size).with_instances(1);
        Self::new(&config, 0, disk)
    }

    /// Returns the index of this instance within the parallel pool.
    pub fn instance_index(&self) -> usize {
        self.instance_index
    }

    /// Returns statistics about this instance.
    pub fn stats(&self) -> BufferPoolStats {
        let mut pinned = 0;
        let mut dirty = 0;
        for frame in &self.frames {
            if frame.is_pinned() {
                pinned += 1;
            }
            if frame.is_dirty() {
                dirty += 1;
            }
        }

        BufferPoolStats {
            fetches: self.fetch_count.load(Ordering::Relaxed),
            hits: self.hit_count.load(Ordering::Relaxed),
            misses: self.miss_count.load(Ordering::Relaxed),
            evictions: self.eviction_count.load(Ordering::Relaxed),
            flushes: self.flush_count.load(Ordering::Relaxed),
            pinned_frames: pinned,
            dirty_frames: dirty,
        }
    }

    // -------------------------------------------------------------------------
    // Private helpers
    // -------------------------------------------------------------------------

    /// Hands out the next page id in this instance's residue class.
    fn allocate_page_id(&self, state: &mut PoolState) -> PageId {
        let id = state.next_page_id;
        state.next_page_id += self.num_instances as u64;
        debug_assert_eq!(
            id % self.num_instances as u64,
            self.instance_index as u64,
            "allocated id must map back to this instance"
        );
        trace!(instance = self.instance_index, page_id = id, "allocated page id");
        PageId::new(id)
    }

    /// Acquires a frame for a new resident page: free list first, then a
    /// replacer victim (written back if dirty, page-table entry erased).
    ///
    /// The returned frame is empty, unpinned, clean, and in neither the
    /// free list, the page table, nor the replacer.
    fn acquire_frame(&self, state: &mut PoolState) -> BufferResult<FrameId> {
        if let Some(frame_id) = state.free_list.pop_front() {
            return Ok(frame_id);
        }

        let Some(frame_id) = state.replacer.victim() else {
            return Err(BufferError::PoolExhausted);
        };
        let frame = &self.frames[frame_id.index()];
        let old_page_id = frame.page_id();

        if frame.is_dirty() {
            debug!(
                instance = self.instance_index,
                page_id = %old_page_id,
                frame_id = frame_id.index(),
                "writing back dirty victim"
            );
            if let Err(e) = self.disk.write_page(old_page_id, &frame.read_data()[..]) {
                // Failed write-back leaves the victim resident; put it
                // back so the pool stays consistent.
                state.replacer.unpin(frame_id);
                return Err(e.into());
            }
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }

        state.page_table.remove(&old_page_id);
        frame.reset();
        self.eviction_count.fetch_add(1, Ordering::Relaxed);
        Ok(frame_id)
    }
}

impl BufferPool for BufferPoolInstance {
    fn new_page(&self) -> BufferResult<Arc<BufferFrame>> {
        let mut state = self.state.lock();

        let frame_id = self.acquire_frame(&mut state)?;
        let page_id = self.allocate_page_id(&mut state);

        // Reserve the on-disk slot so this page reads back as zeroes
        // even if it is evicted before its first flush.
        if let Err(e) = self.disk.write_page(page_id, &ZERO_PAGE) {
            state.free_list.push_back(frame_id);
            return Err(e.into());
        }

        let frame = &self.frames[frame_id.index()];
        frame.set_page_id(page_id);
        frame.pin();
        state.page_table.insert(page_id, frame_id);

        Ok(Arc::clone(frame))
    }

    fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>> {
        self.fetch_count.fetch_add(1, Ordering::Relaxed);
        let mut state = self.state.lock();

        if let Some(&frame_id) = state.page_table.get(&page_id) {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
            let frame = &self.frames[frame_id.index()];
            frame.pin();
            state.replacer.pin(frame_id);
            return Ok(Arc::clone(frame));
        }

        self.miss_count.fetch_add(1, Ordering::Relaxed);
        let frame_id = self.acquire_frame(&mut state)?;
        let frame = &self.frames[frame_id.index()];

        if let Err(e) = self.disk.read_page(page_id, &mut frame.write_data()[..]) {
            // Free-list frames must be zeroed; scrub the partial read.
            frame.reset();
            state.free_list.push_back(frame_id);
            return Err(e.into());
        }

        frame.set_page_id(page_id);
        frame.pin();
        state.page_table.insert(page_id, frame_id);

        Ok(Arc::clone(frame))
    }

    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()> {
        let mut state = self.state.lock();

        let &frame_id = state
            .page_table
            .get(&page_id)
            .ok_or_else(|| BufferError::not_resident(page_id))?;
        let frame = &self.frames[frame_id.index()];

        if frame.pin_count() == 0 {
            return Err(BufferError::NotPinned { page_id });
        }

        if is_dirty {
            frame.set_dirty(true);
        }
        if frame.unpin() == 0 {
            state.replacer.unpin(frame_id);
        }
        Ok(())
    }

    fn flush_page(&self, page_id: PageId) -> BufferResult<()> {
        let state = self.state.lock();

        let &frame_id = state
            .page_table
            .get(&page_id)
            .ok_or_else(|| BufferError::not_resident(page_id))?;
        let frame = &self.frames[frame_id.index()];

        self.disk.write_page(page_id, &frame.read_data()[..])?;
        frame.set_dirty(false);
        self.flush_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn delete_page(&self, page_id: PageId) -> BufferResult<()> {
        let mut state = self.state.lock();

        let Some(&frame_id) = state.page_table.get(&page_id) else {
            // Not resident: nothing to do.
            return Ok(());
        };
        let frame = &self.frames[frame_id.index()];

        let pin_count = frame.pin_count();
        if pin_count != 0 {
            return Err(BufferError::PagePinned { page_id, pin_count });
        }

        // The frame was unpinned and resident, so the replacer tracks it.
        state.replacer.pin(frame_id);
        state.page_table.remove(&page_id);
        frame.reset();
        state.free_list.push_back(frame_id);

        self.disk.deallocate_page(page_id);
        debug!(instance = self.instance_index, page_id = %page_id, "deleted page");
        Ok(())
    }

    fn flush_all_pages(&self) -> BufferResult<()> {
        let state = self.state.lock();

        for (&page_id, &frame_id) in &state.page_table {
            let frame = &self.frames[frame_id.index()];
            self.disk.write_page(page_id, &frame.read_data()[..])?;
            frame.set_dirty(false);
            self.flush_count.fetch_add(1, Ordering::Relaxed);
        }
        Ok(())
    }

    fn pool_size(&self) -> usize {
        self.pool_size
    }
}

impl std::fmt::Debug for BufferPoolInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("BufferPoolInstance")
            .field("instance_index", &self.instance_index)
            .field("num_instances", &self.num_instances)
            .field("pool_size", &self.pool_size)
            .field("resident_pages", &state.page_table.len())
            .field("free_frames", &state.free_list.len())
            .field("evictable_frames", &state.replacer.size())
            .finish()
    }
}
