//! The buffer pool contract exposed to higher layers.

use std::sync::Arc;

use quarry_common::types::PageId;

use super::error::BufferResult;
use super::frame::BufferFrame;
use super::guard::PageGuard;

/// The operations a buffer pool offers to access methods.
///
/// Implemented by both [`BufferPoolInstance`](super::BufferPoolInstance)
/// (one shard) and [`ParallelBufferPool`](super::ParallelBufferPool)
/// (the sharded front). Returned frames are pinned; every successful
/// `new_page`/`fetch_page` must be matched by exactly one
/// `unpin_page`, and callers must not retain the frame reference past
/// that unpin. The [`PageGuard`] helpers encode the discipline as RAII.
pub trait BufferPool: Send + Sync {
    /// Allocates a fresh page id and returns its pinned, zeroed frame.
    ///
    /// Fails with [`PoolExhausted`](super::BufferError::PoolExhausted)
    /// when every frame is pinned.
    fn new_page(&self) -> BufferResult<Arc<BufferFrame>>;

    /// Returns a pinned frame holding `page_id`, reading it from disk if
    /// it is not resident.
    fn fetch_page(&self, page_id: PageId) -> BufferResult<Arc<BufferFrame>>;

    /// Releases one pin on `page_id`, folding `is_dirty` into the
    /// frame's dirty flag. When the pin count reaches zero the frame
    /// becomes an eviction candidate.
    fn unpin_page(&self, page_id: PageId, is_dirty: bool) -> BufferResult<()>;

    /// Writes the resident page `page_id` to disk and clears its dirty
    /// flag. Flushing a clean or pinned page is legal.
    fn flush_page(&self, page_id: PageId) -> BufferResult<()>;

    /// Removes `page_id` from the pool, zeroing its frame and returning
    /// the frame to the free list. Deleting a page that is not resident
    /// succeeds (idempotent); deleting a pinned page fails.
    fn delete_page(&self, page_id: PageId) -> BufferResult<()>;

    /// Writes every resident page to disk, clearing dirty flags.
    fn flush_all_pages(&self) -> BufferResult<()>;

    /// Total number of frames this pool owns.
    fn pool_size(&self) -> usize;

    /// Allocates a new page and wraps the pinned frame in a guard that
    /// unpins on drop.
    fn new_page_guarded(&self) -> BufferResult<PageGuard<'_>>
    where
        Self: Sized,
    {
        let frame = self.new_page()?;
        Ok(PageGuard::new(self, frame))
    }

    /// Fetches a page and wraps the pinned frame in a guard that unpins
    /// on drop.
    fn fetch_page_guarded(&self, page_id: PageId) -> BufferResult<PageGuard<'_>>
    where
        Self: Sized,
    {
        let frame = self.fetch_page(page_id)?;
        Ok(PageGuard::new(self, frame))
    }
}
