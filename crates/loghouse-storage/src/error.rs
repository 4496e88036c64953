//! Storage Error Types
//!
//! This module defines all error types that can occur during log operations.
//!
//! ## Error Categories
//!
//! ### Caller errors
//! - `OffsetOutOfRange`: the requested offset is not covered by any segment.
//!   Streaming consumers treat this as "caught up with the tail".
//!
//! ### Internal signals
//! - `IndexFull`: the index's mapped region has no room for another entry.
//!   The log rolls segments before this can normally surface.
//! - `IndexOutOfBounds`: an index read resolved outside the written entries.
//!   The segment translates this into `OffsetOutOfRange` on the read path and
//!   into "empty segment" when recovering the tail at open.
//!
//! ### Failures
//! - `Io`: any underlying file or mmap failure, surfaced unchanged.
//! - `Decode`: stored bytes failed to parse as a record; indicates corruption.
//! - `Closed`: an operation on a store or index that was already closed.
//!
//! ## Usage
//!
//! All storage operations return `Result<T>` which is aliased to
//! `Result<T, Error>`. This allows clean error propagation with `?`.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Index is full")]
    IndexFull,

    #[error("Index entry out of bounds")]
    IndexOutOfBounds,

    #[error("Offset out of range: {offset}")]
    OffsetOutOfRange { offset: u64 },

    #[error("Record decode error: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("Store or index already closed")]
    Closed,
}
