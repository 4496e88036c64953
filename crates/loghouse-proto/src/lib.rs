//! LogHouse Protocol Buffer Definitions
//!
//! This crate contains the gRPC service definition and message types for the
//! LogHouse commit log API.
//!
//! ## Service
//!
//! - **Log**: the commit log API exposed by the server
//!   - `Produce` / `Consume`: unary append and read by offset
//!   - `ProduceStream`: bidirectional stream, one response offset per request
//!   - `ConsumeStream`: server stream that follows the log tail
//!
//! The `Record` message is also the unit the storage engine persists: the
//! engine encodes a `Record` with prost and stores the resulting bytes as an
//! opaque payload, so the on-disk format and the wire format are the same.
//!
//! ## Usage
//!
//! ### Client-side
//!
//! ```ignore
//! use loghouse_proto::log_v1::log_client::LogClient;
//! use loghouse_proto::{ProduceRequest, Record};
//!
//! let mut client = LogClient::connect("http://localhost:9090").await?;
//!
//! let response = client
//!     .produce(ProduceRequest {
//!         record: Some(Record {
//!             value: b"hello".to_vec(),
//!             offset: 0,
//!         }),
//!     })
//!     .await?;
//! println!("assigned offset: {}", response.into_inner().offset);
//! ```
//!
//! ### Server-side
//!
//! ```ignore
//! use loghouse_proto::log_v1::log_server::{Log, LogServer};
//! use loghouse_proto::{ProduceRequest, ProduceResponse};
//! ```

/// Generated types for the `log.v1` package.
pub mod log_v1 {
    tonic::include_proto!("log.v1");
}

pub use log_v1::{ConsumeRequest, ConsumeResponse, ProduceRequest, ProduceResponse, Record};
