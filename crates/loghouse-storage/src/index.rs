//! Segment Offset Index
//!
//! The index is a fixed-width table mapping a record's offset (relative to
//! the segment's base) to the position of its entry in the store file. It is
//! backed by a memory-mapped file so appends are allocation-free and lookups
//! are O(1) pointer arithmetic.
//!
//! ## File Format
//!
//! ```text
//! [Entry 0][Entry 1]...[Entry N-1]
//!
//! Entry (12 bytes):
//! ┌─────────────────┬────────────────┐
//! │ Relative Offset │ Store Position │
//! │ (4 bytes BE)    │ (8 bytes BE)   │
//! └─────────────────┴────────────────┘
//! ```
//!
//! ## Sizing
//!
//! mmap regions cannot grow while mapped, so the file is grown to
//! `max_index_bytes` up front and the logical size tracks the high-water mark
//! of written entries. On clean close the file is truncated back to the
//! logical size, which is how a reopened index recovers its entry count from
//! the file length alone. After a crash the file is still at the pre-grown
//! size, so unflushed tail entries are lost; that trade-off is deliberate.
//!
//! ## Reverse Indexing
//!
//! `read(-1)` returns the last entry. The segment uses this single primitive
//! to reconstruct its next offset when reopening.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

use memmap2::MmapMut;

use crate::config::Config;
use crate::error::{Error, Result};

/// Width of the relative-offset column.
pub const OFF_WIDTH: u64 = 4;
/// Width of the store-position column.
pub const POS_WIDTH: u64 = 8;
/// Width of one index entry.
pub const ENTRY_WIDTH: u64 = OFF_WIDTH + POS_WIDTH;

/// Fixed-width offset→position table over a pre-grown memory-mapped file.
pub struct Index {
    path: PathBuf,
    mmap: MmapMut,
    file: File,
    size: u64,
    closed: bool,
}

impl Index {
    /// Open or create the index file at `path`, grow it to the configured
    /// maximum, and map it read/write shared. The file length *before*
    /// growing is the logical size: a cleanly closed index was truncated to
    /// exactly its entries.
    pub fn open(path: impl AsRef<Path>, config: &Config) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .open(&path)?;

        let size = file.metadata()?.len();
        file.set_len(config.segment.max_index_bytes)?;

        // SAFETY: the mapping is private to this Index, which owns the file
        // handle for its whole lifetime and truncates only after unmapping
        // writes are flushed on close.
        let mmap = unsafe { MmapMut::map_mut(&file)? };

        Ok(Self {
            path,
            mmap,
            file,
            size,
            closed: false,
        })
    }

    /// Append one entry. `Error::IndexFull` signals that the mapped region
    /// has no room left, which is the segment's cue to roll.
    pub fn write(&mut self, rel_offset: u32, pos: u64) -> Result<()> {
        if self.closed {
            return Err(Error::Closed);
        }
        if (self.mmap.len() as u64) < self.size + ENTRY_WIDTH {
            return Err(Error::IndexFull);
        }

        let at = self.size as usize;
        self.mmap[at..at + OFF_WIDTH as usize].copy_from_slice(&rel_offset.to_be_bytes());
        self.mmap[at + OFF_WIDTH as usize..at + ENTRY_WIDTH as usize]
            .copy_from_slice(&pos.to_be_bytes());

        self.size += ENTRY_WIDTH;
        Ok(())
    }

    /// Read entry number `at`. Negative values count back from the end, so
    /// `-1` is the last entry. An empty index or a slot outside the written
    /// entries yields `Error::IndexOutOfBounds`.
    pub fn read(&self, at: i64) -> Result<(u32, u64)> {
        if self.closed {
            return Err(Error::Closed);
        }

        let entries = self.size / ENTRY_WIDTH;
        if entries == 0 {
            return Err(Error::IndexOutOfBounds);
        }

        let slot = if at >= 0 {
            at as u64
        } else {
            entries
                .checked_sub(at.unsigned_abs())
                .ok_or(Error::IndexOutOfBounds)?
        };
        if slot >= entries {
            return Err(Error::IndexOutOfBounds);
        }

        let begin = (slot * ENTRY_WIDTH) as usize;
        let mut off_buf = [0u8; OFF_WIDTH as usize];
        off_buf.copy_from_slice(&self.mmap[begin..begin + OFF_WIDTH as usize]);
        let mut pos_buf = [0u8; POS_WIDTH as usize];
        pos_buf.copy_from_slice(&self.mmap[begin + OFF_WIDTH as usize..begin + ENTRY_WIDTH as usize]);

        Ok((u32::from_be_bytes(off_buf), u64::from_be_bytes(pos_buf)))
    }

    /// Flush the mapping, sync the file, and truncate it to the logical size
    /// so the pre-allocated tail is discarded. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.mmap.flush()?;
        self.file.sync_all()?;
        self.file.set_len(self.size)?;
        self.closed = true;
        Ok(())
    }

    /// Logical size in bytes, always a multiple of [`ENTRY_WIDTH`].
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}
