//! Log Segment
//!
//! A segment pairs one store file with one index file under a shared base
//! offset and coordinates operations across the two. The base offset is the
//! first absolute offset the segment can hold; `next_offset` is the offset
//! the segment will assign on its next append. Both files live in the log
//! directory as `<base_offset>.store` and `<base_offset>.index`, so the
//! segment's identity is fully encoded in its filenames and no separate
//! metadata is kept: reopening a segment reconstructs `next_offset` from the
//! last index entry alone.

use std::fs;
use std::path::Path;

use loghouse_proto::Record;
use prost::Message;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::index::{Index, ENTRY_WIDTH};
use crate::store::Store;

/// One store/index pair covering the offsets `[base_offset, next_offset)`.
pub struct Segment {
    store: Store,
    index: Index,
    base_offset: u64,
    next_offset: u64,
    config: Config,
}

impl Segment {
    /// Open or create the segment with the given base offset in `dir`.
    pub fn open(dir: &Path, base_offset: u64, config: &Config) -> Result<Self> {
        let store = Store::open(dir.join(format!("{base_offset}.store")))?;
        let index = Index::open(dir.join(format!("{base_offset}.index")), config)?;

        // The last index entry tells us where the segment left off; an empty
        // index means a fresh segment starting at its base.
        let next_offset = match index.read(-1) {
            Ok((rel, _)) => base_offset + rel as u64 + 1,
            Err(Error::IndexOutOfBounds) => base_offset,
            Err(e) => return Err(e),
        };

        tracing::debug!(base_offset, next_offset, "segment opened");

        Ok(Self {
            store,
            index,
            base_offset,
            next_offset,
            config: config.clone(),
        })
    }

    /// Append a record, returning the offset assigned to it.
    pub fn append(&mut self, mut record: Record) -> Result<u64> {
        let offset = self.next_offset;
        record.offset = offset;

        let encoded = record.encode_to_vec();
        let (_, pos) = self.store.append(&encoded)?;
        self.index.write((offset - self.base_offset) as u32, pos)?;

        // Advance only after both writes landed. If the index write failed,
        // the store holds an orphan entry, but the next append reuses the
        // same index slot and the orphan stays unreferenced: lost space, not
        // corruption.
        self.next_offset += 1;
        Ok(offset)
    }

    /// Read the record at the given absolute offset.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let rel = offset
            .checked_sub(self.base_offset)
            .ok_or(Error::OffsetOutOfRange { offset })?;

        let (_, pos) = self.index.read(rel as i64).map_err(|e| match e {
            Error::IndexOutOfBounds => Error::OffsetOutOfRange { offset },
            other => other,
        })?;

        let bytes = self.store.read(pos)?;
        Ok(Record::decode(bytes)?)
    }

    /// Whether the segment has no room left: the store reached its cap, or
    /// the index cannot fit another entry. The log rolls a new segment when
    /// this turns true, which must happen before the index wall is hit, so
    /// the index check mirrors the write-side bound rather than comparing
    /// raw sizes (a cap that is not an entry multiple fills early).
    pub fn is_maxed(&self) -> bool {
        self.store.size() >= self.config.segment.max_store_bytes
            || self.index.size() + ENTRY_WIDTH > self.config.segment.max_index_bytes
    }

    /// First absolute offset this segment can hold.
    pub fn base_offset(&self) -> u64 {
        self.base_offset
    }

    /// Absolute offset the segment will assign on its next append.
    pub fn next_offset(&self) -> u64 {
        self.next_offset
    }

    /// Close the index before the store so the index truncation completes
    /// before the store's final flush is discarded.
    pub fn close(&mut self) -> Result<()> {
        self.index.close()?;
        self.store.close()?;
        Ok(())
    }

    /// Close the segment and unlink both of its files.
    pub fn remove(mut self) -> Result<()> {
        self.close()?;
        tracing::debug!(base_offset = self.base_offset, "removing segment files");
        fs::remove_file(self.index.path())?;
        fs::remove_file(self.store.path())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SegmentConfig;
    use crate::index::ENTRY_WIDTH;
    use tempfile::TempDir;

    const BASE_OFFSET: u64 = 16;

    fn record(value: &[u8]) -> Record {
        Record {
            value: value.to_vec(),
            offset: 0,
        }
    }

    fn test_config() -> Config {
        Config {
            segment: SegmentConfig {
                max_index_bytes: 3 * ENTRY_WIDTH,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_open_empty_segment() {
        let dir = TempDir::new().unwrap();
        let segment = Segment::open(dir.path(), BASE_OFFSET, &test_config()).unwrap();

        assert_eq!(segment.base_offset(), BASE_OFFSET);
        assert_eq!(segment.next_offset(), BASE_OFFSET);
        assert!(!segment.is_maxed());
    }

    #[test]
    fn test_append_assigns_sequential_offsets() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &test_config()).unwrap();

        for i in 0..3u64 {
            let offset = segment.append(record(b"Hello World!")).unwrap();
            assert_eq!(offset, BASE_OFFSET + i);
        }
        assert_eq!(segment.next_offset(), BASE_OFFSET + 3);
    }

    #[test]
    fn test_read_after_append() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &test_config()).unwrap();

        for _ in 0..3 {
            segment.append(record(b"Hello World!")).unwrap();
        }

        for i in 0..3u64 {
            let got = segment.read(BASE_OFFSET + i).unwrap();
            assert_eq!(got.value, b"Hello World!");
            assert_eq!(got.offset, BASE_OFFSET + i);
        }
    }

    #[test]
    fn test_maxed_by_index() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &test_config()).unwrap();

        for _ in 0..3 {
            segment.append(record(b"Hello World!")).unwrap();
        }
        assert!(segment.is_maxed());

        // the index has no room for a fourth entry
        assert!(matches!(
            segment.append(record(b"Hello World!")),
            Err(Error::IndexFull)
        ));
        assert_eq!(segment.next_offset(), BASE_OFFSET + 3);
    }

    #[test]
    fn test_maxed_by_unaligned_index_cap() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            segment: SegmentConfig {
                // room for three entries plus five stray bytes
                max_index_bytes: 3 * ENTRY_WIDTH + 5,
                ..Default::default()
            },
        };
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &config).unwrap();

        for _ in 0..3 {
            segment.append(record(b"Hello World!")).unwrap();
        }

        // a fourth entry no longer fits, so the segment must report maxed
        // even though the raw size is below the cap
        assert!(segment.is_maxed());
    }

    #[test]
    fn test_maxed_by_store() {
        let dir = TempDir::new().unwrap();
        let config = Config {
            segment: SegmentConfig {
                // one entry is enough to hit the cap
                max_store_bytes: 16,
                ..Default::default()
            },
        };
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &config).unwrap();

        segment.append(record(b"Hello World!")).unwrap();
        assert!(segment.is_maxed());
    }

    #[test]
    fn test_reopen_reconstructs_next_offset() {
        let dir = TempDir::new().unwrap();
        let config = test_config();

        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &config).unwrap();
        for _ in 0..3 {
            segment.append(record(b"Hello World!")).unwrap();
        }
        segment.close().unwrap();
        drop(segment);

        let reopened = Segment::open(dir.path(), BASE_OFFSET, &config).unwrap();
        assert_eq!(reopened.base_offset(), BASE_OFFSET);
        assert_eq!(reopened.next_offset(), BASE_OFFSET + 3);

        let got = reopened.read(BASE_OFFSET + 2).unwrap();
        assert_eq!(got.value, b"Hello World!");
    }

    #[test]
    fn test_read_out_of_range() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &test_config()).unwrap();
        segment.append(record(b"Hello World!")).unwrap();

        // one past the tail
        let err = segment.read(BASE_OFFSET + 1).unwrap_err();
        assert!(matches!(
            err,
            Error::OffsetOutOfRange {
                offset
            } if offset == BASE_OFFSET + 1
        ));

        // below the base
        let err = segment.read(BASE_OFFSET - 1).unwrap_err();
        assert!(matches!(
            err,
            Error::OffsetOutOfRange {
                offset
            } if offset == BASE_OFFSET - 1
        ));
    }

    #[test]
    fn test_remove_deletes_files() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &test_config()).unwrap();
        segment.append(record(b"Hello World!")).unwrap();

        let store_path = dir.path().join(format!("{BASE_OFFSET}.store"));
        let index_path = dir.path().join(format!("{BASE_OFFSET}.index"));
        assert!(store_path.exists());
        assert!(index_path.exists());

        segment.remove().unwrap();
        assert!(!store_path.exists());
        assert!(!index_path.exists());
    }

    #[test]
    fn test_close_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut segment = Segment::open(dir.path(), BASE_OFFSET, &test_config()).unwrap();
        segment.append(record(b"Hello World!")).unwrap();

        segment.close().unwrap();
        segment.close().unwrap();
    }
}
