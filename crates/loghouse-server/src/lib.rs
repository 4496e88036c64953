//! LogHouse gRPC Surface
//!
//! This crate exposes the commit log over gRPC: unary `Produce`/`Consume`, a
//! bidirectional `ProduceStream`, and a tail-following `ConsumeStream`. The
//! handlers are written against the [`CommitLog`] capability rather than the
//! storage engine directly, and every RPC passes through an injected
//! [`Authorizer`] before touching the log.

pub mod auth;
pub mod service;

pub use auth::{AllowAll, Authorizer, Identity};
pub use service::{CommitLog, LogService};
