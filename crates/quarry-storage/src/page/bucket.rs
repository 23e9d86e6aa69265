//! Hash-bucket page for the linear-probing hash index.

use std::cmp::Ordering;
use std::marker::PhantomData;

use super::codec::FixedCodec;
use quarry_common::constants::PAGE_SIZE;

/// Key comparison capability for bucket operations.
///
/// Index layers supply a comparator so keys can be ordered by collation
/// rules the key type itself does not know about.
pub trait KeyComparator<K> {
    /// Compares two keys.
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering;
}

/// Comparator that uses the key type's own `Ord`.
#[derive(Debug, Clone, Copy, Default)]
pub struct OrdComparator;

impl<K: Ord> KeyComparator<K> for OrdComparator {
    #[inline]
    fn compare(&self, lhs: &K, rhs: &K) -> Ordering {
        lhs.cmp(rhs)
    }
}

/// Largest entry count whose bitmaps and payload fit in `block_len`
/// bytes.
///
/// The block holds an occupied bitmap, a readable bitmap (one bit per
/// slot each, byte-rounded), then `capacity` fixed-size entries.
pub const fn bucket_capacity(block_len: usize, entry_size: usize) -> usize {
    assert!(entry_size > 0);
    let mut cap = (block_len * 8) / (entry_size * 8 + 2);
    while cap > 0 && 2 * ((cap + 7) / 8) + cap * entry_size > block_len {
        cap -= 1;
    }
    cap
}

/// Bucket capacity for a full `PAGE_SIZE` page holding `(K, V)` entries.
pub const fn bucket_array_size<K: FixedCodec, V: FixedCodec>() -> usize {
    bucket_capacity(PAGE_SIZE, K::ENCODED_SIZE + V::ENCODED_SIZE)
}

/// A typed view of one hash bucket stored in a fixed byte block.
///
/// Layout, in order: occupied bitmap, readable bitmap, entry array.
/// `occupied[i]` is set the first time slot `i` is used and never
/// cleared for the life of the page; `readable[i]` is set while slot
/// `i` holds a live entry and cleared on removal (a tombstone). The
/// distinction is what lets a linear-probe scan continue past removed
/// entries yet stop at the first never-used slot. Occupied slots always
/// form a prefix of the array, because inserts fill the first
/// non-readable slot.
///
/// A zeroed block is a valid empty bucket.
pub struct BucketPage<'a, K, V> {
    data: &'a mut [u8],
    capacity: usize,
    bitmap_len: usize,
    _marker: PhantomData<(K, V)>,
}

impl<'a, K, V> BucketPage<'a, K, V>
where
    K: FixedCodec,
    V: FixedCodec + PartialEq,
{
    /// Wraps `data` as a bucket page. Capacity is derived from the block
    /// length, so an index layer hands in whole pages while tests may
    /// use smaller blocks.
    pub fn new(data: &'a mut [u8]) -> Self {
        let capacity = bucket_capacity(data.len(), K::ENCODED_SIZE + V::ENCODED_SIZE);
        let bitmap_len = (capacity + 7) / 8;
        Self {
            data,
            capacity,
            bitmap_len,
            _marker: PhantomData,
        }
    }

    /// Number of slots in this bucket.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Zeroes the block, making it an empty bucket.
    pub fn initialize(&mut self) {
        self.data.fill(0);
    }

    /// Collects the values of every live entry whose key compares equal
    /// to `key`.
    pub fn get<C: KeyComparator<K>>(&self, key: &K, cmp: &C) -> Vec<V> {
        let mut result = Vec::new();
        for i in 0..self.capacity {
            if !self.is_occupied(i) {
                break;
            }
            if self.is_readable(i) && cmp.compare(key, &self.key_at_raw(i)).is_eq() {
                result.push(self.value_at_raw(i));
            }
        }
        result
    }

    /// Inserts `(key, value)`, failing when the bucket is full or when
    /// an identical pair is already present.
    pub fn insert<C: KeyComparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        // Reject an exact duplicate of a live entry.
        for i in 0..self.capacity {
            if !self.is_occupied(i) {
                break;
            }
            if self.is_readable(i)
                && cmp.compare(key, &self.key_at_raw(i)).is_eq()
                && self.value_at_raw(i) == *value
            {
                return false;
            }
        }

        // First non-readable slot: either a tombstone or the slot just
        // past the occupied prefix.
        let Some(slot) = (0..self.capacity).find(|&i| !self.is_readable(i)) else {
            return false;
        };

        self.set_occupied(slot);
        self.set_readable(slot);
        self.write_entry(slot, key, value);
        true
    }

    /// Removes the first live entry matching both `key` and `value`,
    /// leaving a tombstone. Returns false when no entry matches.
    pub fn remove<C: KeyComparator<K>>(&mut self, key: &K, value: &V, cmp: &C) -> bool {
        for i in 0..self.capacity {
            if !self.is_occupied(i) {
                break;
            }
            if self.is_readable(i)
                && cmp.compare(key, &self.key_at_raw(i)).is_eq()
                && self.value_at_raw(i) == *value
            {
                self.clear_readable(i);
                return true;
            }
        }
        false
    }

    /// The key in slot `i`, if the slot holds a live entry.
    pub fn key_at(&self, i: usize) -> Option<K> {
        (self.is_occupied(i) && self.is_readable(i)).then(|| self.key_at_raw(i))
    }

    /// The value in slot `i`, if the slot holds a live entry.
    pub fn value_at(&self, i: usize) -> Option<V> {
        (self.is_occupied(i) && self.is_readable(i)).then(|| self.value_at_raw(i))
    }

    /// Tombstones slot `i` if it currently holds a live entry.
    pub fn remove_at(&mut self, i: usize) {
        if self.is_readable(i) {
            self.clear_readable(i);
        }
    }

    /// Returns true if slot `i` has ever held an entry.
    #[inline]
    pub fn is_occupied(&self, i: usize) -> bool {
        debug_assert!(i < self.capacity);
        self.data[i / 8] & (1 << (i % 8)) != 0
    }

    /// Returns true if slot `i` currently holds a live entry.
    #[inline]
    pub fn is_readable(&self, i: usize) -> bool {
        debug_assert!(i < self.capacity);
        self.data[self.bitmap_len + i / 8] & (1 << (i % 8)) != 0
    }

    /// Sets the occupied bit for slot `i`.
    #[inline]
    pub fn set_occupied(&mut self, i: usize) {
        debug_assert!(i < self.capacity);
        self.data[i / 8] |= 1 << (i % 8);
    }

    /// Sets the readable bit for slot `i`.
    #[inline]
    pub fn set_readable(&mut self, i: usize) {
        debug_assert!(i < self.capacity);
        self.data[self.bitmap_len + i / 8] |= 1 << (i % 8);
    }

    /// Number of live entries.
    pub fn num_readable(&self) -> usize {
        let mut count = 0;
        for i in 0..self.capacity {
            if !self.is_occupied(i) {
                break;
            }
            if self.is_readable(i) {
                count += 1;
            }
        }
        count
    }

    /// Returns true if no slot can take another entry.
    pub fn is_full(&self) -> bool {
        self.num_readable() == self.capacity
    }

    /// Returns true if the bucket holds no live entries.
    pub fn is_empty(&self) -> bool {
        self.num_readable() == 0
    }

    #[inline]
    fn clear_readable(&mut self, i: usize) {
        self.data[self.bitmap_len + i / 8] &= !(1 << (i % 8));
    }

    #[inline]
    fn entry_offset(&self, i: usize) -> usize {
        2 * self.bitmap_len + i * (K::ENCODED_SIZE + V::ENCODED_SIZE)
    }

    fn key_at_raw(&self, i: usize) -> K {
        let off = self.entry_offset(i);
        K::decode_from(&self.data[off..off + K::ENCODED_SIZE])
    }

    fn value_at_raw(&self, i: usize) -> V {
        let off = self.entry_offset(i) + K::ENCODED_SIZE;
        V::decode_from(&self.data[off..off + V::ENCODED_SIZE])
    }

    fn write_entry(&mut self, i: usize, key: &K, value: &V) {
        let off = self.entry_offset(i);
        key.encode_to(&mut self.data[off..off + K::ENCODED_SIZE]);
        value.encode_to(&mut self.data[off + K::ENCODED_SIZE..off + K::ENCODED_SIZE + V::ENCODED_SIZE]);
    }
}

impl<K, V> std::fmt::Debug for BucketPage<'_, K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BucketPage")
            .field("capacity", &self.capacity)
            .field("bitmap_len", &self.bitmap_len)
            .finish()
    }
}
