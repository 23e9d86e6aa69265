//! RAII page guards for safe pin/unpin pairing.
//!
//! A guard keeps its frame pinned while held and performs the matching
//! `unpin_page` - with the dirty flag it accumulated - when dropped.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use quarry_common::types::PageId;

use super::frame::BufferFrame;
use super::pool::BufferPool;

/// A pinned page in the buffer pool.
///
/// Provides access to the page bytes; taking mutable access records the
/// page as dirty so the drop-time unpin reports it. Dropping the guard
/// releases exactly one pin.
pub struct PageGuard<'a> {
    pool: &'a dyn BufferPool,
    frame: Arc<BufferFrame>,
    page_id: PageId,
    dirty: bool,
}

impl<'a> PageGuard<'a> {
    /// Creates a guard over an already pinned frame.
    pub(crate) fn new(pool: &'a dyn BufferPool, frame: Arc<BufferFrame>) -> Self {
        let page_id = frame.page_id();
        Self {
            pool,
            frame,
            page_id,
            dirty: false,
        }
    }

    /// Returns the page ID.
    #[inline]
    pub fn page_id(&self) -> PageId {
        self.page_id
    }

    /// Returns a read-only view of the page bytes.
    #[inline]
    pub fn data(&self) -> impl Deref<Target = [u8]> + '_ {
        PageDataRef {
            guard: self.frame.read_data(),
        }
    }

    /// Returns a mutable view of the page bytes and marks the page
    /// dirty.
    #[inline]
    pub fn data_mut(&mut self) -> impl DerefMut<Target = [u8]> + '_ {
        self.dirty = true;
        PageDataMut {
            guard: self.frame.write_data(),
        }
    }

    /// Marks the page dirty without touching the bytes.
    #[inline]
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Returns true if this guard will report the page dirty on unpin.
    #[inline]
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }
}

impl Drop for PageGuard<'_> {
    fn drop(&mut self) {
        // The unpin can only fail if the pairing discipline was already
        // broken elsewhere; nothing useful can be done about it here.
        let _ = self.pool.unpin_page(self.page_id, self.dirty);
    }
}

impl std::fmt::Debug for PageGuard<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageGuard")
            .field("page_id", &self.page_id)
            .field("dirty", &self.dirty)
            .finish()
    }
}

/// Helper struct to provide `Deref` for page data.
struct PageDataRef<'a> {
    guard: parking_lot::RwLockReadGuard<'a, Vec<u8>>,
}

impl Deref for PageDataRef<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

/// Helper struct to provide `DerefMut` for page data.
struct PageDataMut<'a> {
    guard: parking_lot::RwLockWriteGuard<'a, Vec<u8>>,
}

impl Deref for PageDataMut<'_> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}

impl DerefMut for PageDataMut<'_> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.guard
    }
}
