//! Record Store File
//!
//! The store is the payload file of a segment: an append-only sequence of
//! length-prefixed entries. The segment's index maps offsets to positions in
//! this file; the store itself knows nothing about offsets or records.
//!
//! ## File Format
//!
//! ```text
//! [Entry 1][Entry 2]...[Entry N]
//!
//! Entry:
//! ┌──────────────┬───────────────┐
//! │ Length       │ Payload       │
//! │ (8 bytes BE) │ (length bytes)│
//! └──────────────┴───────────────┘
//! ```
//!
//! An entry's *position* is the byte offset of its length prefix.
//!
//! ## Write Path
//!
//! Appends go through a buffered writer; each entry is assembled into one
//! frame and handed to the buffer in a single write, so a failed append never
//! advances the logical size past a partial entry. Reads flush the buffer
//! first and then read positionally, which is why readers and the writer
//! share one lock.
//!
//! ## Durability
//!
//! The buffer is flushed on every read and on close; no fsync is issued per
//! append. A crash can lose buffered entries, and a torn trailing entry left
//! by a crash mid-flush is not detected on reopen (payloads carry no
//! checksum).

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::os::unix::fs::FileExt;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};

/// Width of the big-endian length prefix that frames every entry.
pub const LEN_WIDTH: u64 = 8;

/// Append-only, length-prefixed record file with buffered writes and
/// positional reads.
pub struct Store {
    path: PathBuf,
    inner: Mutex<StoreInner>,
}

struct StoreInner {
    buf: BufWriter<File>,
    size: u64,
    closed: bool,
}

impl Store {
    /// Open or create the store file at `path`. The current file size becomes
    /// the logical size, so reopening a store resumes where it left off.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&path)?;
        let size = file.metadata()?.len();

        Ok(Self {
            path,
            inner: Mutex::new(StoreInner {
                buf: BufWriter::new(file),
                size,
                closed: false,
            }),
        })
    }

    /// Append a length-prefixed entry. Returns the total bytes written and
    /// the position where the entry begins.
    pub fn append(&self, bytes: &[u8]) -> Result<(u64, u64)> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(Error::Closed);
        }

        let pos = inner.size;

        // One frame, one write: the size only advances past whole entries.
        let mut frame = BytesMut::with_capacity(LEN_WIDTH as usize + bytes.len());
        frame.put_u64(bytes.len() as u64);
        frame.put_slice(bytes);
        inner.buf.write_all(&frame)?;

        inner.size += frame.len() as u64;
        Ok((frame.len() as u64, pos))
    }

    /// Read the entry that begins at `pos`.
    pub fn read(&self, pos: u64) -> Result<Bytes> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(Error::Closed);
        }

        // The writer buffers, so flush before reading to observe every
        // prior append.
        inner.buf.flush()?;

        let file = inner.buf.get_ref();
        let mut len_buf = [0u8; LEN_WIDTH as usize];
        file.read_exact_at(&mut len_buf, pos)?;

        let len = u64::from_be_bytes(len_buf);
        let mut payload = vec![0u8; len as usize];
        file.read_exact_at(&mut payload, pos + LEN_WIDTH)?;

        Ok(Bytes::from(payload))
    }

    /// Positional read into `buf` starting at byte `off`. The caller manages
    /// entry framing; used by streaming readers.
    pub fn read_at(&self, buf: &mut [u8], off: u64) -> Result<usize> {
        let mut inner = self.lock();
        if inner.closed {
            return Err(Error::Closed);
        }

        inner.buf.flush()?;
        inner.buf.get_ref().read_exact_at(buf, off)?;
        Ok(buf.len())
    }

    /// Logical size in bytes: the sum of all appended entry widths.
    pub fn size(&self) -> u64 {
        self.lock().size
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Flush buffered appends and mark the store closed. Closing twice is a
    /// no-op; the file handle is released when the store is dropped.
    pub fn close(&self) -> Result<()> {
        let mut inner = self.lock();
        if inner.closed {
            return Ok(());
        }
        inner.buf.flush()?;
        inner.closed = true;
        Ok(())
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const PAYLOAD: &[u8] = b"hello world";

    fn entry_width() -> u64 {
        LEN_WIDTH + PAYLOAD.len() as u64
    }

    fn open_store(dir: &TempDir) -> Store {
        Store::open(dir.path().join("0.store")).unwrap()
    }

    #[test]
    fn test_append_then_read() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);

        for i in 0..3u64 {
            let (n, pos) = store.append(PAYLOAD).unwrap();
            assert_eq!(n, entry_width());
            assert_eq!(pos, i * entry_width());
        }

        for i in 0..3u64 {
            let got = store.read(i * entry_width()).unwrap();
            assert_eq!(&got[..], PAYLOAD);
        }

        assert_eq!(store.size(), 3 * entry_width());
    }

    #[test]
    fn test_read_at_raw_framing() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.append(PAYLOAD).unwrap();

        let mut len_buf = [0u8; LEN_WIDTH as usize];
        let n = store.read_at(&mut len_buf, 0).unwrap();
        assert_eq!(n, LEN_WIDTH as usize);
        assert_eq!(u64::from_be_bytes(len_buf), PAYLOAD.len() as u64);

        let mut payload = vec![0u8; PAYLOAD.len()];
        let n = store.read_at(&mut payload, LEN_WIDTH).unwrap();
        assert_eq!(n, PAYLOAD.len());
        assert_eq!(&payload[..], PAYLOAD);
    }

    #[test]
    fn test_reopen_resumes_at_end() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0.store");

        let store = Store::open(&path).unwrap();
        store.append(PAYLOAD).unwrap();
        store.close().unwrap();
        drop(store);

        let reopened = Store::open(&path).unwrap();
        assert_eq!(reopened.size(), entry_width());
        assert_eq!(&reopened.read(0).unwrap()[..], PAYLOAD);

        let (_, pos) = reopened.append(PAYLOAD).unwrap();
        assert_eq!(pos, entry_width());
    }

    #[test]
    fn test_read_past_end_is_io_error() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.append(PAYLOAD).unwrap();

        let err = store.read(store.size()).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let store = open_store(&dir);
        store.append(PAYLOAD).unwrap();

        store.close().unwrap();
        store.close().unwrap();

        assert!(matches!(store.append(PAYLOAD), Err(Error::Closed)));
        assert!(matches!(store.read(0), Err(Error::Closed)));
    }

    #[test]
    fn test_close_flushes_buffered_appends() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("0.store");

        let store = Store::open(&path).unwrap();
        store.append(PAYLOAD).unwrap();
        store.close().unwrap();

        // The entry must be on disk, not stranded in the writer's buffer.
        let on_disk = std::fs::metadata(&path).unwrap().len();
        assert_eq!(on_disk, entry_width());
    }
}
