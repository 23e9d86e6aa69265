//! Page replacement policies for the buffer pool.
//!
//! A replacer tracks the frames currently eligible for eviction. A frame
//! becomes eligible when its pin count drops to zero and stops being
//! eligible when it is pinned again or evicted.

use std::collections::HashMap;
use std::ptr::NonNull;

use super::frame::FrameId;

/// Page replacement policy.
///
/// The pool calls `unpin` when a frame's pin count reaches zero, `pin`
/// before handing a frame to a caller, and `victim` when it needs to
/// reclaim a frame. Implementations decide the eviction order; the
/// eligibility invariant (a frame is present iff it is resident and
/// unpinned) is maintained by the pool.
///
/// `pin` must tolerate frames that are not present and `unpin` frames
/// that already are - the pool calls both defensively.
pub trait Replacer: Send {
    /// Removes and returns the next eviction victim, or `None` if no
    /// frame is eligible.
    fn victim(&mut self) -> Option<FrameId>;

    /// Removes `frame_id` from the eligible set. No-op if absent.
    fn pin(&mut self, frame_id: FrameId);

    /// Adds `frame_id` to the eligible set. No-op if already present.
    fn unpin(&mut self, frame_id: FrameId);

    /// Returns the number of eligible frames.
    fn size(&self) -> usize;
}

/// A node in the LRU linked list.
struct Node {
    frame_id: FrameId,
    prev: Option<NonNull<Node>>,
    next: Option<NonNull<Node>>,
}

impl Node {
    fn new(frame_id: FrameId) -> Self {
        Self {
            frame_id,
            prev: None,
            next: None,
        }
    }
}

/// LRU (Least Recently Used) page replacement policy.
///
/// Uses a doubly-linked list ordered by the moment a frame became
/// eligible, with a side table from frame id to list node for O(1)
/// `pin`. `victim` takes the tail - the frame that has been evictable
/// the longest. Re-unpinning an already eligible frame does not refresh
/// its position: only the pinned-to-evictable transition records
/// recency.
pub struct LruReplacer {
    /// Map from frame id to its node.
    map: HashMap<FrameId, NonNull<Node>>,
    /// Head of the list (most recently became evictable).
    head: Option<NonNull<Node>>,
    /// Tail of the list (next victim).
    tail: Option<NonNull<Node>>,
}

// Safety: LruReplacer owns all of its nodes and is only reachable behind
// the pool instance latch.
unsafe impl Send for LruReplacer {}

impl LruReplacer {
    /// Creates a new LRU replacer sized for `capacity` frames.
    pub fn new(capacity: usize) -> Self {
        Self {
            map: HashMap::with_capacity(capacity),
            head: None,
            tail: None,
        }
    }

    /// Pushes a node to the front of the list.
    fn push_front(&mut self, mut node_ptr: NonNull<Node>) {
        unsafe {
            node_ptr.as_mut().prev = None;
            node_ptr.as_mut().next = self.head;

            if let Some(mut head) = self.head {
                head.as_mut().prev = Some(node_ptr);
            }

            self.head = Some(node_ptr);

            if self.tail.is_none() {
                self.tail = Some(node_ptr);
            }
        }
    }

    /// Unlinks a node from the list.
    fn unlink(&mut self, node_ptr: NonNull<Node>) {
        unsafe {
            let prev = node_ptr.as_ref().prev;
            let next = node_ptr.as_ref().next;

            match prev {
                Some(mut p) => p.as_mut().next = next,
                None => self.head = next,
            }
            match next {
                Some(mut n) => n.as_mut().prev = prev,
                None => self.tail = prev,
            }
        }
    }
}

impl Replacer for LruReplacer {
    fn victim(&mut self) -> Option<FrameId> {
        let tail = self.tail?;
        self.unlink(tail);
        // Safety: the tail pointer came from Box::into_raw and was only
        // ever reachable through this replacer.
        let node = unsafe { Box::from_raw(tail.as_ptr()) };
        self.map.remove(&node.frame_id);
        Some(node.frame_id)
    }

    fn pin(&mut self, frame_id: FrameId) {
        if let Some(node_ptr) = self.map.remove(&frame_id) {
            self.unlink(node_ptr);
            // Safety: removed from the map above, so this is the sole owner.
            drop(unsafe { Box::from_raw(node_ptr.as_ptr()) });
        }
    }

    fn unpin(&mut self, frame_id: FrameId) {
        if self.map.contains_key(&frame_id) {
            return;
        }
        let node = Box::new(Node::new(frame_id));
        let node_ptr = NonNull::from(Box::leak(node));
        self.push_front(node_ptr);
        self.map.insert(frame_id, node_ptr);
    }

    fn size(&self) -> usize {
        self.map.len()
    }
}

impl Drop for LruReplacer {
    fn drop(&mut self) {
        let mut current = self.head;
        while let Some(node_ptr) = current {
            unsafe {
                current = node_ptr.as_ref().next;
                drop(Box::from_raw(node_ptr.as_ptr()));
            }
        }
    }
}

impl std::fmt::Debug for LruReplacer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LruReplacer")
            .field("size", &self.size())
            .finish()
    }
}
