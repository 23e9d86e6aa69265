//! Integration tests for the buffer pool stack: parallel pool, pool
//! instances, replacer, and disk manager working against a real
//! temporary file.

use std::collections::HashSet;
use std::sync::Arc;

use tempfile::{tempdir, TempDir};

use quarry_common::constants::PAGE_SIZE;
use quarry_common::types::PageId;
use quarry_storage::buffer::{
    BufferError, BufferPool, BufferPoolConfig, BufferPoolInstance, ParallelBufferPool,
};
use quarry_storage::disk::DiskManager;

fn open_disk(dir: &TempDir) -> Arc<DiskManager> {
    Arc::new(DiskManager::open(dir.path().join("quarry.db"), PAGE_SIZE).unwrap())
}

fn open_instance(dir: &TempDir, pool_size: usize) -> (BufferPoolInstance, Arc<DiskManager>) {
    let disk = open_disk(dir);
    let pool = BufferPoolInstance::standalone(pool_size, Arc::clone(&disk)).unwrap();
    (pool, disk)
}

fn open_parallel(
    dir: &TempDir,
    pool_size: usize,
    num_instances: usize,
) -> (ParallelBufferPool, Arc<DiskManager>) {
    let disk = open_disk(dir);
    let config = BufferPoolConfig::new(pool_size).with_instances(num_instances);
    let pool = ParallelBufferPool::new(&config, Arc::clone(&disk)).unwrap();
    (pool, disk)
}

#[test]
fn exhausted_pool_recovers_after_dirty_unpin() {
    let dir = tempdir().unwrap();
    let (pool, disk) = open_instance(&dir, 10);

    let mut ids = Vec::new();
    for _ in 0..10 {
        let frame = pool.new_page().unwrap();
        ids.push(frame.page_id());
    }
    assert!(matches!(pool.new_page(), Err(BufferError::PoolExhausted)));

    // Dirty page 0 and release it; the next allocation evicts it,
    // writing its contents back first.
    let first = ids[0];
    pool.fetch_page(first).unwrap().write_data()[0..6].copy_from_slice(b"page-0");
    pool.unpin_page(first, true).unwrap(); // matches the fetch
    pool.unpin_page(first, true).unwrap(); // matches the new_page

    let fresh = pool.new_page().unwrap();
    assert_eq!(fresh.page_id(), PageId::new(10));
    assert!(!ids.contains(&fresh.page_id()));

    let mut on_disk = vec![0u8; PAGE_SIZE];
    disk.read_page(first, &mut on_disk).unwrap();
    assert_eq!(&on_disk[0..6], b"page-0");
}

#[test]
fn reentrant_pins_need_matching_unpins() {
    let dir = tempdir().unwrap();
    let (pool, _disk) = open_instance(&dir, 1);

    let frame = pool.new_page().unwrap();
    let page_id = frame.page_id();
    assert_eq!(page_id, PageId::new(0));
    assert_eq!(frame.frame_id().index(), 0);
    pool.unpin_page(page_id, false).unwrap();

    let again = pool.fetch_page(page_id).unwrap();
    assert_eq!(again.frame_id().index(), 0);
    let once_more = pool.fetch_page(page_id).unwrap();
    assert_eq!(once_more.frame_id().index(), 0);
    assert_eq!(once_more.pin_count(), 2);

    pool.unpin_page(page_id, false).unwrap();
    pool.unpin_page(page_id, false).unwrap();
    assert!(matches!(
        pool.unpin_page(page_id, false),
        Err(BufferError::NotPinned { .. })
    ));
}

#[test]
fn parallel_allocation_covers_every_residue() {
    let dir = tempdir().unwrap();
    let (pool, _disk) = open_parallel(&dir, 1, 4);

    let ids: Vec<PageId> = (0..4).map(|_| pool.new_page().unwrap().page_id()).collect();
    let residues: HashSet<u64> = ids.iter().map(|id| id.as_u64() % 4).collect();
    assert_eq!(residues, HashSet::from([0, 1, 2, 3]));

    // Every frame is pinned, so a fifth allocation fails...
    assert!(matches!(pool.new_page(), Err(BufferError::PoolExhausted)));

    // ...and succeeds again once any shard has an evictable frame.
    pool.unpin_page(ids[2], false).unwrap();
    let fifth = pool.new_page().unwrap();
    assert_eq!(fifth.page_id().as_u64() % 4, ids[2].as_u64() % 4);
}

#[test]
fn delete_pinned_page_is_rejected() {
    let dir = tempdir().unwrap();
    let (pool, _disk) = open_instance(&dir, 4);

    let page_id = pool.new_page().unwrap().page_id();
    assert!(matches!(
        pool.delete_page(page_id),
        Err(BufferError::PagePinned { .. })
    ));

    pool.unpin_page(page_id, false).unwrap();
    pool.delete_page(page_id).unwrap();
    // Idempotent once gone.
    pool.delete_page(page_id).unwrap();

    // The disk manager does not reuse the id, so a refetch reads the
    // zeroed image reserved at allocation.
    let frame = pool.fetch_page(page_id).unwrap();
    assert!(frame.read_data().iter().all(|&b| b == 0));
    pool.unpin_page(page_id, false).unwrap();
}

#[test]
fn dirty_flag_is_sticky_until_flush() {
    let dir = tempdir().unwrap();
    let (pool, disk) = open_instance(&dir, 2);

    let frame = pool.new_page().unwrap();
    let page_id = frame.page_id();
    frame.write_data()[0..5].copy_from_slice(b"v-one");
    pool.unpin_page(page_id, true).unwrap();

    // A later clean round trip must not launder the dirty flag.
    pool.fetch_page(page_id).unwrap();
    pool.unpin_page(page_id, false).unwrap();
    assert!(frame.is_dirty());

    pool.flush_page(page_id).unwrap();
    assert!(!frame.is_dirty());

    let mut on_disk = vec![0u8; PAGE_SIZE];
    disk.read_page(page_id, &mut on_disk).unwrap();
    assert_eq!(&on_disk[0..5], b"v-one");
}

#[test]
fn pin_unpin_round_trip_restores_pin_count() {
    let dir = tempdir().unwrap();
    let (pool, _disk) = open_instance(&dir, 2);

    let frame = pool.new_page().unwrap();
    let page_id = frame.page_id();
    let before = frame.pin_count();

    pool.fetch_page(page_id).unwrap();
    pool.unpin_page(page_id, false).unwrap();

    assert_eq!(frame.pin_count(), before);
    // Still resident: fetching is a hit.
    let stats_before = pool.stats().misses;
    pool.fetch_page(page_id).unwrap();
    assert_eq!(pool.stats().misses, stats_before);
}

#[test]
fn eviction_takes_longest_evictable_page() {
    let dir = tempdir().unwrap();
    let (pool, _disk) = open_instance(&dir, 3);

    let a = pool.new_page().unwrap().page_id();
    let b = pool.new_page().unwrap().page_id();
    let c = pool.new_page().unwrap().page_id();

    pool.unpin_page(a, false).unwrap();
    pool.unpin_page(b, false).unwrap();
    pool.unpin_page(c, false).unwrap();

    // Free list is empty, so this evicts `a` (evictable longest).
    let d = pool.new_page().unwrap().page_id();
    pool.unpin_page(d, false).unwrap();

    let misses_before = pool.stats().misses;
    pool.fetch_page(b).unwrap();
    pool.unpin_page(b, false).unwrap();
    pool.fetch_page(c).unwrap();
    pool.unpin_page(c, false).unwrap();
    assert_eq!(pool.stats().misses, misses_before);

    pool.fetch_page(a).unwrap();
    pool.unpin_page(a, false).unwrap();
    assert_eq!(pool.stats().misses, misses_before + 1);
}

#[test]
fn guards_unpin_and_report_dirtiness_on_drop() {
    let dir = tempdir().unwrap();
    let (pool, disk) = open_instance(&dir, 2);

    let page_id = {
        let mut guard = pool.new_page_guarded().unwrap();
        guard.data_mut()[0..7].copy_from_slice(b"guarded");
        guard.page_id()
    };

    // The guard's drop released the only pin and reported the write.
    let frame = pool.fetch_page_guarded(page_id).unwrap();
    assert_eq!(&frame.data()[0..7], b"guarded");
    drop(frame);

    pool.flush_page(page_id).unwrap();
    let mut on_disk = vec![0u8; PAGE_SIZE];
    disk.read_page(page_id, &mut on_disk).unwrap();
    assert_eq!(&on_disk[0..7], b"guarded");
}

#[test]
fn evicted_new_page_reads_back_as_zeroes() {
    let dir = tempdir().unwrap();
    let (pool, _disk) = open_instance(&dir, 1);

    // Allocate and release without ever writing or flushing.
    let page_id = pool.new_page().unwrap().page_id();
    pool.unpin_page(page_id, false).unwrap();

    // Force the page out of its only frame.
    let other = pool.new_page().unwrap().page_id();
    pool.unpin_page(other, false).unwrap();

    // The allocation reserved the on-disk slot, so this reads zeroes.
    let frame = pool.fetch_page(page_id).unwrap();
    assert!(frame.read_data().iter().all(|&b| b == 0));
    pool.unpin_page(page_id, false).unwrap();
}

#[test]
fn concurrent_fetch_and_unpin_smoke() {
    let dir = tempdir().unwrap();
    let (pool, _disk) = open_parallel(&dir, 16, 4);
    let pool = Arc::new(pool);

    const THREADS: usize = 8;
    const ROUNDS: usize = 50;

    std::thread::scope(|scope| {
        for t in 0..THREADS {
            let pool = Arc::clone(&pool);
            scope.spawn(move || {
                let marker = t as u8 + 1;
                for round in 0..ROUNDS {
                    let frame = pool.new_page().expect("pool sized for all threads");
                    let page_id = frame.page_id();
                    frame.write_data()[0] = marker;
                    pool.unpin_page(page_id, true).unwrap();

                    let again = pool.fetch_page(page_id).unwrap();
                    assert_eq!(again.read_data()[0], marker);
                    pool.unpin_page(page_id, false).unwrap();

                    if round % 5 == 0 {
                        pool.delete_page(page_id).unwrap();
                    }
                }
            });
        }
    });

    // Every page id handed out routes back to the shard that owns its
    // residue class, so all bookkeeping must balance out.
    pool.flush_all_pages().unwrap();
    assert_eq!(pool.stats().pinned_frames, 0);
}
