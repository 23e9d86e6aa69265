//! Page-file disk manager.

use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tracing::trace;

use quarry_common::types::PageId;

use super::error::{DiskError, DiskResult};

/// Synchronous disk manager backed by a single page-array file.
///
/// The file is addressed as an array of fixed-size blocks at offset
/// `page_id * page_size`. Pages that have never been written read back
/// as zeroes; with strided page-id allocation the file is sparse and the
/// filesystem fills the holes.
///
/// All operations lock the underlying file handle for their duration,
/// so interleaved reads and writes from multiple pool instances are
/// safe.
pub struct DiskManager {
    /// The database file, guarded for seek+read/write atomicity.
    file: Mutex<File>,
    /// The database file path.
    path: PathBuf,
    /// Page size in bytes.
    page_size: usize,
    /// Number of page reads served.
    read_count: AtomicU64,
    /// Number of page writes performed.
    write_count: AtomicU64,
}

impl DiskManager {
    /// Opens (creating if necessary) the database file at `path`.
    pub fn open(path: impl AsRef<Path>, page_size: usize) -> DiskResult<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)
            .map_err(|e| DiskError::open(&path, e))?;

        Ok(Self {
            file: Mutex::new(file),
            path,
            page_size,
            read_count: AtomicU64::new(0),
            write_count: AtomicU64::new(0),
        })
    }

    /// Returns the database file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the page size this manager was opened with.
    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Reads the page at `page_id` into `buf`.
    ///
    /// A page beyond the end of the file, or a short read, zero-fills the
    /// remainder of `buf`: an unwritten page is defined to read as zeroes.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `buf` is exactly one page long.
    pub fn read_page(&self, page_id: PageId, buf: &mut [u8]) -> DiskResult<()> {
        debug_assert_eq!(buf.len(), self.page_size);
        let offset = self.offset_of(page_id);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < buf.len() {
            match file.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        if filled < buf.len() {
            trace!(page_id = %page_id, filled, "short read, zero-filling remainder");
            buf[filled..].fill(0);
        }

        self.read_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes `data` as the page at `page_id`.
    ///
    /// # Panics
    ///
    /// Debug-asserts that `data` is exactly one page long.
    pub fn write_page(&self, page_id: PageId, data: &[u8]) -> DiskResult<()> {
        debug_assert_eq!(data.len(), self.page_size);
        let offset = self.offset_of(page_id);

        let mut file = self.file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;

        self.write_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Announces that `page_id` is no longer in use.
    ///
    /// Advisory only: the block stays allocated in the file and the id may
    /// be handed out again by the pool's striped allocator.
    pub fn deallocate_page(&self, page_id: PageId) {
        trace!(page_id = %page_id, "page deallocated (advisory)");
    }

    /// Syncs all written pages to stable storage.
    pub fn sync(&self) -> DiskResult<()> {
        self.file.lock().sync_all()?;
        Ok(())
    }

    /// Number of page reads served so far.
    pub fn read_count(&self) -> u64 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Number of page writes performed so far.
    pub fn write_count(&self) -> u64 {
        self.write_count.load(Ordering::Relaxed)
    }

    #[inline]
    fn offset_of(&self, page_id: PageId) -> u64 {
        page_id.as_u64() * self.page_size as u64
    }
}

impl std::fmt::Debug for DiskManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiskManager")
            .field("path", &self.path)
            .field("page_size", &self.page_size)
            .field("reads", &self.read_count())
            .field("writes", &self.write_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const TEST_PAGE_SIZE: usize = 4096;

    fn open_test_manager(dir: &tempfile::TempDir) -> DiskManager {
        DiskManager::open(dir.path().join("test.db"), TEST_PAGE_SIZE).unwrap()
    }

    #[test]
    fn test_write_then_read() {
        let dir = tempdir().unwrap();
        let disk = open_test_manager(&dir);

        let mut data = vec![0u8; TEST_PAGE_SIZE];
        data[0..4].copy_from_slice(&[0xde, 0xad, 0xbe, 0xef]);
        disk.write_page(PageId::new(3), &data).unwrap();

        let mut out = vec![0xffu8; TEST_PAGE_SIZE];
        disk.read_page(PageId::new(3), &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn test_unwritten_page_reads_zeroes() {
        let dir = tempdir().unwrap();
        let disk = open_test_manager(&dir);

        let mut out = vec![0xffu8; TEST_PAGE_SIZE];
        disk.read_page(PageId::new(100), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_sparse_writes_leave_holes_zeroed() {
        let dir = tempdir().unwrap();
        let disk = open_test_manager(&dir);

        let data = vec![0xabu8; TEST_PAGE_SIZE];
        disk.write_page(PageId::new(5), &data).unwrap();

        // Page 2 was skipped over; it must still read as zeroes.
        let mut out = vec![0xffu8; TEST_PAGE_SIZE];
        disk.read_page(PageId::new(2), &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_counters() {
        let dir = tempdir().unwrap();
        let disk = open_test_manager(&dir);

        let data = vec![0u8; TEST_PAGE_SIZE];
        let mut buf = vec![0u8; TEST_PAGE_SIZE];
        disk.write_page(PageId::new(0), &data).unwrap();
        disk.write_page(PageId::new(1), &data).unwrap();
        disk.read_page(PageId::new(0), &mut buf).unwrap();

        assert_eq!(disk.write_count(), 2);
        assert_eq!(disk.read_count(), 1);
    }

    #[test]
    fn test_open_failure_has_path_context() {
        let err = DiskManager::open("/no/such/dir/quarry.db", TEST_PAGE_SIZE).unwrap_err();
        assert!(err.to_string().contains("/no/such/dir/quarry.db"));
    }

    #[test]
    fn test_sync() {
        let dir = tempdir().unwrap();
        let disk = open_test_manager(&dir);
        let data = vec![1u8; TEST_PAGE_SIZE];
        disk.write_page(PageId::new(0), &data).unwrap();
        disk.sync().unwrap();
    }
}
