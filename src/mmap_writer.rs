//! Circular log region backed by a memory map.
//!
//! Records are copied straight into the mapped pages; the kernel writes them
//! back to the file. A write reserves its range with one `fetch_add` on the
//! offset. When the reservation runs past the end of the region the offset is
//! reset to the record's length and the record is written at position 0,
//! overwriting the oldest data.
//!
//! Concurrent writers only synchronize through that offset. Two writers that
//! both overflow the region at the same moment both restart at position 0 and
//! their bytes interleave; the region then holds a torn record, which
//! [`RecordReader`](crate::RecordReader) skips over. A reader of the region
//! must tolerate torn records at the wrap point and at the write head anyway,
//! so no lock is taken to rule this out.

use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::ptr;
use std::slice;
use std::sync::atomic::{AtomicU64, Ordering};

use memmap2::{MmapMut, MmapOptions, MmapRaw};
use tracing::{debug, trace, warn};

use crate::error::{Error, Result};
use crate::sink::Sink;

pub struct MmapWriter {
    map: MmapRaw,
    capacity: u64,
    offset: AtomicU64,
    page_size: u64,
    path: Option<PathBuf>,
}

impl MmapWriter {
    /// Maps `path` as a region of `capacity` bytes, creating the file if needed
    /// and resizing it to exactly `capacity`.
    ///
    /// # Errors
    ///
    /// I/O errors from opening, resizing or mapping the file, and
    /// [`Error::InvalidCapacity`] for a zero capacity.
    pub fn open<P: AsRef<Path>>(path: P, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(path)?;
        file.set_len(capacity as u64)?;
        let map = MmapOptions::new().len(capacity).map_raw(&file)?;

        debug!(path = %path.display(), capacity, "mapped log region");
        Ok(Self::from_map(map, Some(path.to_path_buf())))
    }

    /// In-memory region with the same circular semantics and no backing file.
    pub fn anonymous(capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(Error::InvalidCapacity(capacity));
        }

        let map = MmapRaw::from(MmapMut::map_anon(capacity)?);
        debug!(capacity, "mapped anonymous log region");
        Ok(Self::from_map(map, None))
    }

    fn from_map(map: MmapRaw, path: Option<PathBuf>) -> Self {
        Self {
            capacity: map.len() as u64,
            map,
            offset: AtomicU64::new(0),
            page_size: page_size(),
            path,
        }
    }

    /// Copies `record` into the region and returns the number of bytes written.
    ///
    /// A record larger than the whole region is truncated to the region size.
    pub fn write(&self, record: &[u8]) -> usize {
        let n = (record.len() as u64).min(self.capacity);
        if n == 0 {
            return 0;
        }

        let mut end = self.offset.fetch_add(n, Ordering::AcqRel) + n;
        if end > self.capacity {
            self.offset.store(n, Ordering::Release);
            end = n;
            trace!(len = n, "log region wrapped");
        }
        let start = end - n;

        // SAFETY: `start + n <= capacity`, so the destination lies inside the
        // mapping, which lives as long as `self`. The source is a separate
        // slice. Reservations from `fetch_add` are disjoint except for the
        // concurrent-wrap case described in the module docs.
        unsafe {
            ptr::copy_nonoverlapping(
                record.as_ptr(),
                self.map.as_mut_ptr().add(start as usize),
                n as usize,
            );
        }

        let start_page = start / self.page_size;
        let end_page = end / self.page_size;
        if start_page != end_page && self.path.is_some() {
            self.sync_page(start_page * self.page_size);
        }

        n as usize
    }

    /// Schedules write-back of the page starting at `offset` without waiting.
    fn sync_page(&self, offset: u64) {
        let len = self.page_size.min(self.capacity - offset);
        if let Err(err) = self.map.flush_async_range(offset as usize, len as usize) {
            warn!(error = %err, offset, "async flush of log region failed");
        }
    }

    /// Writes every dirty page back to the file and waits for completion.
    pub fn flush(&self) -> Result<()> {
        if self.path.is_some() {
            self.map.flush()?;
        }
        Ok(())
    }

    /// Flushes and unmaps the region.
    pub fn close(self) -> Result<()> {
        self.flush()?;
        debug!(path = ?self.path, "closed log region");
        Ok(())
    }

    /// Position where the next record will start, unless it wraps.
    pub fn offset(&self) -> usize {
        self.offset.load(Ordering::Acquire) as usize
    }

    pub fn capacity(&self) -> usize {
        self.capacity as usize
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The whole region, including stale bytes from before the last wrap.
    ///
    /// Taking `&mut self` keeps writes through this handle from racing the
    /// returned slice.
    pub fn contents(&mut self) -> &[u8] {
        // SAFETY: the mapping is `capacity` bytes long and outlives the
        // borrow; the exclusive borrow rules out concurrent `write` calls.
        unsafe { slice::from_raw_parts(self.map.as_ptr(), self.capacity as usize) }
    }
}

impl Sink for MmapWriter {
    #[inline]
    fn write(&self, record: &[u8]) -> Result<()> {
        MmapWriter::write(self, record);
        Ok(())
    }
}

impl std::fmt::Debug for MmapWriter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MmapWriter")
            .field("path", &self.path)
            .field("capacity", &self.capacity)
            .field("offset", &self.offset())
            .finish()
    }
}

#[cfg(unix)]
fn page_size() -> u64 {
    // SAFETY: sysconf has no preconditions.
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size > 0 {
        size as u64
    } else {
        4096
    }
}

#[cfg(not(unix))]
fn page_size() -> u64 {
    4096
}
