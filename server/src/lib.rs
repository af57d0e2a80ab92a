//! HTTP server for the todo lists service.
//!
//! # Overview
//! Wires `todo_core` behind an axum router. [`serve`] is the whole process
//! lifecycle: open both databases, start the worker pool, serve until
//! Ctrl-C or SIGTERM, then drain the pool.

pub mod api;
pub mod config;
pub mod error;
pub mod telemetry;

use std::sync::Arc;

use thiserror::Error;
use todo_core::{FtsSearchIndex, SearchError, SqliteStore, StoreError, TaskRuntime, TodoService};
use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

pub use api::{router, AppState};
pub use config::{Config, ConfigError};

const IN_MEMORY: &str = ":memory:";

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("cannot open todo store: {0}")]
    Store(#[from] StoreError),
    #[error("cannot open search index: {0}")]
    Search(#[from] SearchError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Builds the domain service from the configured database paths.
pub fn build_service(config: &Config) -> Result<TodoService, ServerError> {
    let store = if config.database_path == IN_MEMORY {
        SqliteStore::open_in_memory()?
    } else {
        SqliteStore::open(&config.database_path)?
    };
    let search = if config.search_index_path == IN_MEMORY {
        FtsSearchIndex::open_in_memory()?
    } else {
        FtsSearchIndex::open(&config.search_index_path)?
    };
    Ok(TodoService::new(
        Arc::new(store),
        Arc::new(search),
        config.search_sync,
    ))
}

pub async fn serve(config: Config) -> Result<(), ServerError> {
    let service = build_service(&config)?;
    let search_sync = service.sync_policy();
    let (queue, pool) = TaskRuntime::start(service.clone(), config.tasks);
    let app = router(AppState::new(service, Arc::new(queue)));

    let listener = TcpListener::bind(config.socket_addr()).await?;
    info!(
        address = %listener.local_addr()?,
        %search_sync,
        workers = config.tasks.workers,
        "listening"
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;
    pool.shutdown().await;
    served?;
    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "cannot listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(error) => {
                warn!(%error, "cannot listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("shutdown signal received");
}
