//! Page layout and disk format for QuarryDB.
//!
//! All data is organized into fixed-size pages that the buffer pool
//! caches and the disk manager persists. This module defines the page
//! formats themselves; the first (and reference) format is the
//! hash-bucket page used by the linear-probing hash index:
//!
//! ```text
//! +----------------------+
//! |   occupied bitmap    |  ⌈capacity / 8⌉ bytes
//! +----------------------+
//! |   readable bitmap    |  ⌈capacity / 8⌉ bytes
//! +----------------------+
//! |   (key, value) array |  capacity × entry size
//! +----------------------+
//! ```
//!
//! Entries are fixed-size; capacity is the largest count for which all
//! three regions fit in the block.

mod bucket;
mod codec;

pub use bucket::{bucket_array_size, bucket_capacity, BucketPage, KeyComparator, OrdComparator};
pub use codec::FixedCodec;

/// Page size used by the storage engine.
pub const PAGE_SIZE: usize = quarry_common::constants::PAGE_SIZE;
