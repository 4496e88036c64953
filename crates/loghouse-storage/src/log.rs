//! Segmented Commit Log
//!
//! The log is an ordered collection of segments sharing one directory. All
//! appends go to the *active* segment (always the newest); when the active
//! segment reaches a size cap the log seals it and rolls a new one whose base
//! offset continues where the previous segment stopped. Reads binary-search
//! the segment list for the one covering the requested offset.
//!
//! ```text
//! append ──────────────────────────────┐
//!                                      ▼
//! ┌───────────┐ ┌───────────┐ ┌──────────────┐
//! │ segment 0 │ │ segment N │ │ active       │
//! │ (sealed)  │ │ (sealed)  │ │ segment      │
//! └───────────┘ └───────────┘ └──────────────┘
//!       ▲             ▲              ▲
//! read ─┴─────────────┴──────────────┘  (binary search by offset)
//! ```
//!
//! ## Concurrency
//!
//! One readers–writer lock guards the segment list: `append` takes the write
//! side (it may mutate the list by rolling), `read` takes the read side.
//! Store-level flushing is handled by each segment's own store lock, so many
//! consumers can read concurrently while a single producer appends.
//!
//! ## Recovery
//!
//! Opening a log lists its directory, parses the `<base_offset>.store` /
//! `<base_offset>.index` filenames, and reopens one segment per distinct base
//! offset; each segment reconstructs its tail from its index. No additional
//! metadata file exists. Durability is only guaranteed after `close`, which
//! flushes every store and truncates every index.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use loghouse_proto::Record;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::segment::Segment;

/// Append-only, offset-addressable log over a directory of segments.
pub struct Log {
    dir: PathBuf,
    config: Config,
    segments: RwLock<Vec<Segment>>,
}

impl Log {
    /// Open the log in `dir`, creating the directory and an initial segment
    /// if none exist yet.
    pub fn open(dir: impl AsRef<Path>, mut config: Config) -> Result<Self> {
        config.normalize();

        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;

        // Every segment contributes two files with the same stem, so collect
        // the base offsets into a set to sort and de-duplicate in one go.
        let mut base_offsets = BTreeSet::new();
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match stem.parse::<u64>() {
                Ok(base) => {
                    base_offsets.insert(base);
                }
                Err(_) => {
                    tracing::warn!(
                        file = %path.display(),
                        "skipping non-segment file in log directory"
                    );
                }
            }
        }

        let mut segments = Vec::with_capacity(base_offsets.len().max(1));
        for base in &base_offsets {
            segments.push(Segment::open(&dir, *base, &config)?);
        }
        if segments.is_empty() {
            segments.push(Segment::open(&dir, config.segment.initial_offset, &config)?);
        }

        tracing::info!(
            dir = %dir.display(),
            segments = segments.len(),
            "log opened"
        );

        Ok(Self {
            dir,
            config,
            segments: RwLock::new(segments),
        })
    }

    /// Append a record to the active segment, rolling a new segment if the
    /// active one is full afterwards. Returns the assigned offset.
    pub fn append(&self, record: Record) -> Result<u64> {
        let mut segments = self.write_guard();
        let active = segments
            .last_mut()
            .expect("log always holds at least one segment");

        let offset = active.append(record)?;

        if active.is_maxed() {
            let base = offset + 1;
            tracing::debug!(base_offset = base, "active segment maxed, rolling");
            segments.push(Segment::open(&self.dir, base, &self.config)?);
        }

        Ok(offset)
    }

    /// Read the record stored at `offset`.
    pub fn read(&self, offset: u64) -> Result<Record> {
        let segments = self.read_guard();

        // First segment whose next_offset is beyond the requested offset.
        let i = segments.partition_point(|s| s.next_offset() <= offset);
        match segments.get(i) {
            Some(segment) => segment.read(offset),
            None => Err(Error::OffsetOutOfRange { offset }),
        }
    }

    /// Lowest offset held by the log.
    pub fn lowest_offset(&self) -> u64 {
        let segments = self.read_guard();
        segments.first().map(Segment::base_offset).unwrap_or_default()
    }

    /// Highest offset assigned so far (zero for an empty log).
    pub fn highest_offset(&self) -> u64 {
        let segments = self.read_guard();
        let next = segments.last().map(Segment::next_offset).unwrap_or_default();
        next.saturating_sub(1)
    }

    /// Remove every sealed segment whose records all sit at or below
    /// `lowest`. The active segment is never removed.
    pub fn truncate(&self, lowest: u64) -> Result<()> {
        let mut segments = self.write_guard();
        let total = segments.len();
        let mut kept = Vec::with_capacity(total);

        for (i, segment) in segments.drain(..).enumerate() {
            if i + 1 < total && segment.next_offset() <= lowest + 1 {
                segment.remove()?;
            } else {
                kept.push(segment);
            }
        }

        *segments = kept;
        Ok(())
    }

    /// Close every segment in order. Only after a clean close are buffered
    /// store bytes and unflushed index entries guaranteed to be on disk.
    pub fn close(&self) -> Result<()> {
        let mut segments = self.write_guard();
        for segment in segments.iter_mut() {
            segment.close()?;
        }
        tracing::info!(dir = %self.dir.display(), "log closed");
        Ok(())
    }

    /// Close the log and delete its directory.
    pub fn remove(&self) -> Result<()> {
        self.close()?;
        fs::remove_dir_all(&self.dir)?;
        Ok(())
    }

    fn read_guard(&self) -> RwLockReadGuard<'_, Vec<Segment>> {
        self.segments.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_guard(&self) -> RwLockWriteGuard<'_, Vec<Segment>> {
        self.segments.write().unwrap_or_else(|e| e.into_inner())
    }
}
