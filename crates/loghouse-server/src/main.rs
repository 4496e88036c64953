//! LogHouse gRPC Server
//!
//! Main entry point for the LogHouse commit log server.
//!
//! ## Configuration
//!
//! All configuration is done via environment variables:
//!
//! - `LOGHOUSE_ADDR`: Server bind address (default: 0.0.0.0:9090)
//! - `LOGHOUSE_DATA_DIR`: Log directory (default: ./data/log)
//! - `LOGHOUSE_MAX_STORE_BYTES`: Segment store cap in bytes (0 = default)
//! - `LOGHOUSE_MAX_INDEX_BYTES`: Segment index cap in bytes (0 = default)
//! - `LOGHOUSE_INITIAL_OFFSET`: Base offset for a fresh log (default: 0)
//!
//! ## Logging
//!
//! Logging is controlled via the `RUST_LOG` environment variable:
//! ```bash
//! RUST_LOG=debug cargo run -p loghouse-server    # Detailed logs
//! RUST_LOG=info cargo run -p loghouse-server     # Standard logs (default)
//! ```
//!
//! ## Shutdown
//!
//! SIGINT/SIGTERM drain the gRPC server and then close the log, which
//! flushes the stores and truncates the pre-grown index files; killing the
//! process skips that and loses any buffered tail entries.

use std::sync::Arc;

use loghouse_proto::log_v1::log_server::LogServer;
use loghouse_server::{AllowAll, LogService};
use loghouse_storage::{Config, Log, SegmentConfig};
use tonic::transport::Server;

fn env_u64(key: &str) -> Result<u64, std::num::ParseIntError> {
    match std::env::var(key) {
        Ok(value) => value.parse(),
        Err(_) => Ok(0),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    // Configuration
    let bind_addr = std::env::var("LOGHOUSE_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
        .parse()?;

    let data_dir =
        std::env::var("LOGHOUSE_DATA_DIR").unwrap_or_else(|_| "./data/log".to_string());

    let config = Config {
        segment: SegmentConfig {
            max_store_bytes: env_u64("LOGHOUSE_MAX_STORE_BYTES")?,
            max_index_bytes: env_u64("LOGHOUSE_MAX_INDEX_BYTES")?,
            initial_offset: env_u64("LOGHOUSE_INITIAL_OFFSET")?,
        },
    };

    tracing::info!(dir = %data_dir, "opening commit log");
    let log = Arc::new(Log::open(&data_dir, config)?);

    let service = LogService::new(log.clone(), Arc::new(AllowAll));

    // Shutdown signal handling
    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        let ctrl_c = async {
            tokio::signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        #[cfg(unix)]
        let terminate = async {
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => tracing::info!("received SIGINT, initiating graceful shutdown"),
            _ = terminate => tracing::info!("received SIGTERM, initiating graceful shutdown"),
        }

        let _ = shutdown_tx.send(());
    });

    tracing::info!(%bind_addr, "LogHouse server starting");
    Server::builder()
        .add_service(LogServer::new(service))
        .serve_with_shutdown(bind_addr, async {
            shutdown_rx.await.ok();
        })
        .await?;

    // Flushes the stores and truncates the indexes; skipping this would
    // leave the pre-grown index files reading as full on reopen.
    log.close()?;
    tracing::info!("LogHouse server shut down gracefully");

    Ok(())
}
