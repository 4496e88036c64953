//! LogHouse gRPC Service
//!
//! Implements the four `log.v1.Log` RPCs on top of anything that can append
//! and read records. The service holds the log behind the two-method
//! [`CommitLog`] capability, so the handlers never reach into storage
//! internals.
//!
//! ## Streaming semantics
//!
//! - `ProduceStream` is bidirectional: each inbound request is appended and
//!   answered with its assigned offset; the first error ends the stream.
//! - `ConsumeStream` is a server stream that *follows the tail*: once the
//!   consumer catches up, `OffsetOutOfRange` is not an error but a signal to
//!   wait. The service wakes waiting consumers on every successful append
//!   and additionally retries after a bounded backoff, so a record appended
//!   at time T reaches a tailing consumer within notification delivery or
//!   one backoff period.

use std::sync::Arc;
use std::time::Duration;

use loghouse_proto::log_v1::log_server::Log as LogRpc;
use loghouse_proto::{ConsumeRequest, ConsumeResponse, ProduceRequest, ProduceResponse, Record};
use tokio::sync::{mpsc, Notify};
use tokio_stream::wrappers::ReceiverStream;
use tonic::{Request, Response, Status, Streaming};

use crate::auth::{self, Authorizer};

/// Upper bound on how long a tailing consumer waits before re-checking the
/// log, even if no append notification arrives.
const TAIL_BACKOFF: Duration = Duration::from_millis(50);

/// Buffered responses per open stream.
const STREAM_BUFFER: usize = 64;

/// The capability the RPC surface needs from a log: append a record and get
/// its offset back, or read the record at an offset.
pub trait CommitLog: Send + Sync {
    fn append(&self, record: Record) -> loghouse_storage::Result<u64>;
    fn read(&self, offset: u64) -> loghouse_storage::Result<Record>;
}

impl CommitLog for loghouse_storage::Log {
    fn append(&self, record: Record) -> loghouse_storage::Result<u64> {
        loghouse_storage::Log::append(self, record)
    }

    fn read(&self, offset: u64) -> loghouse_storage::Result<Record> {
        loghouse_storage::Log::read(self, offset)
    }
}

/// gRPC service implementation for the commit log.
pub struct LogService {
    log: Arc<dyn CommitLog>,
    authorizer: Arc<dyn Authorizer>,
    appended: Arc<Notify>,
}

impl LogService {
    pub fn new(log: Arc<dyn CommitLog>, authorizer: Arc<dyn Authorizer>) -> Self {
        Self {
            log,
            authorizer,
            appended: Arc::new(Notify::new()),
        }
    }

    fn authorize<T>(&self, request: &Request<T>, action: &str) -> Result<(), Status> {
        self.authorizer
            .authorize(&auth::subject(request), auth::OBJECT_WILDCARD, action)
    }
}

fn status_from(err: loghouse_storage::Error) -> Status {
    match err {
        loghouse_storage::Error::OffsetOutOfRange { offset } => {
            Status::out_of_range(format!("offset out of range: {offset}"))
        }
        other => Status::internal(other.to_string()),
    }
}

#[tonic::async_trait]
impl LogRpc for LogService {
    #[tracing::instrument(
        skip(self, request),
        fields(value_len = request.get_ref().record.as_ref().map(|r| r.value.len()).unwrap_or(0))
    )]
    async fn produce(
        &self,
        request: Request<ProduceRequest>,
    ) -> Result<Response<ProduceResponse>, Status> {
        self.authorize(&request, auth::PRODUCE_ACTION)?;

        let record = request
            .into_inner()
            .record
            .ok_or_else(|| Status::invalid_argument("produce request has no record"))?;

        let offset = self.log.append(record).map_err(status_from)?;
        self.appended.notify_waiters();

        tracing::debug!(offset, "record produced");
        Ok(Response::new(ProduceResponse { offset }))
    }

    #[tracing::instrument(skip(self, request), fields(offset = request.get_ref().offset))]
    async fn consume(
        &self,
        request: Request<ConsumeRequest>,
    ) -> Result<Response<ConsumeResponse>, Status> {
        self.authorize(&request, auth::CONSUME_ACTION)?;

        let offset = request.into_inner().offset;
        let record = self.log.read(offset).map_err(status_from)?;

        Ok(Response::new(ConsumeResponse {
            record: Some(record),
        }))
    }

    type ProduceStreamStream = ReceiverStream<Result<ProduceResponse, Status>>;

    async fn produce_stream(
        &self,
        request: Request<Streaming<ProduceRequest>>,
    ) -> Result<Response<Self::ProduceStreamStream>, Status> {
        self.authorize(&request, auth::PRODUCE_ACTION)?;

        let mut inbound = request.into_inner();
        let log = self.log.clone();
        let appended = self.appended.clone();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            loop {
                let req = match inbound.message().await {
                    Ok(Some(req)) => req,
                    Ok(None) => break,
                    Err(status) => {
                        let _ = tx.send(Err(status)).await;
                        break;
                    }
                };

                let Some(record) = req.record else {
                    let _ = tx
                        .send(Err(Status::invalid_argument(
                            "produce request has no record",
                        )))
                        .await;
                    break;
                };

                match log.append(record) {
                    Ok(offset) => {
                        appended.notify_waiters();
                        if tx.send(Ok(ProduceResponse { offset })).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(status_from(err))).await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }

    type ConsumeStreamStream = ReceiverStream<Result<ConsumeResponse, Status>>;

    #[tracing::instrument(skip(self, request), fields(offset = request.get_ref().offset))]
    async fn consume_stream(
        &self,
        request: Request<ConsumeRequest>,
    ) -> Result<Response<Self::ConsumeStreamStream>, Status> {
        self.authorize(&request, auth::CONSUME_ACTION)?;

        let mut offset = request.into_inner().offset;
        let log = self.log.clone();
        let appended = self.appended.clone();
        let (tx, rx) = mpsc::channel(STREAM_BUFFER);

        tokio::spawn(async move {
            loop {
                match log.read(offset) {
                    Ok(record) => {
                        let response = ConsumeResponse {
                            record: Some(record),
                        };
                        if tx.send(Ok(response)).await.is_err() {
                            // consumer went away
                            break;
                        }
                        offset += 1;
                    }
                    Err(loghouse_storage::Error::OffsetOutOfRange { .. }) => {
                        // Caught up with the tail: wait for the next append
                        // notification, but never longer than the backoff
                        // bound, and bail out as soon as the stream closes.
                        let notified = appended.notified();
                        tokio::select! {
                            _ = notified => {}
                            _ = tokio::time::sleep(TAIL_BACKOFF) => {}
                            _ = tx.closed() => break,
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(status_from(err))).await;
                        break;
                    }
                }
            }
        });

        Ok(Response::new(ReceiverStream::new(rx)))
    }
}
