//! LogHouse Storage Engine
//!
//! This crate implements the segmented, append-only commit log that backs the
//! LogHouse gRPC API: a durable ordered sequence of opaque records, each
//! addressed by a monotonically assigned 64-bit offset.
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Log              (directory, RwLock)        │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐  │
//! │  │ Segment 0 │ │ Segment 3 │ │ Segment 6 │  │  ← active
//! │  │ ┌───────┐ │ │           │ │           │  │
//! │  │ │ Store │ │ │    ...    │ │    ...    │  │  .store: framed payloads
//! │  │ ├───────┤ │ │           │ │           │  │
//! │  │ │ Index │ │ │           │ │           │  │  .index: offset → position
//! │  │ └───────┘ │ │           │ │           │  │          (mmap'd)
//! │  └───────────┘ └───────────┘ └───────────┘  │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Main Components
//!
//! - [`Store`]: length-prefixed append-only payload file with buffered
//!   writes and positional reads.
//! - [`Index`]: fixed-width offset→position table over a pre-grown
//!   memory-mapped file; truncated to its written entries on close.
//! - [`Segment`]: one store/index pair under a shared base offset; enforces
//!   the size caps and reconstructs its tail on reopen.
//! - [`Log`]: routes appends to the active segment, rolls segments when
//!   full, and binary-searches segments on reads.
//!
//! ## Usage
//!
//! ```ignore
//! use loghouse_storage::{Config, Log};
//! use loghouse_proto::Record;
//!
//! let log = Log::open("./data/log", Config::default())?;
//!
//! let offset = log.append(Record {
//!     value: b"hello".to_vec(),
//!     offset: 0, // assigned by the log
//! })?;
//!
//! let record = log.read(offset)?;
//! assert_eq!(record.value, b"hello");
//!
//! log.close()?; // flushes stores, truncates indexes
//! ```

pub mod config;
pub mod error;
pub mod index;
pub mod log;
pub mod segment;
pub mod store;

pub use config::{Config, SegmentConfig};
pub use error::{Error, Result};
pub use index::Index;
pub use log::Log;
pub use segment::Segment;
pub use store::Store;
