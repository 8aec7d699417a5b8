//! Startup orchestration.
//!
//! Config is already loaded and validated by the time [`start`] runs.
//! Subsystems come up in order; the listener binds last so traffic only
//! arrives once everything behind it exists. An unreachable database is
//! not fatal: the pool starts degraded.

use std::net::SocketAddr;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::{TokenCodec, TokenError};
use crate::config::ApiConfig;
use crate::db::{PgManager, Pool, PoolConfig};
use crate::http::{AppState, HttpServer};
use crate::observability::metrics;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("database url is not set")]
    MissingDatabaseUrl,

    #[error("invalid database url: {0}")]
    DatabaseUrl(#[source] sqlx::Error),

    #[error("token codec: {0}")]
    Token(#[from] TokenError),

    #[error("failed to bind {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },
}

/// Bring up every subsystem and bind the listener.
pub async fn start(config: ApiConfig) -> Result<(HttpServer, TcpListener), StartupError> {
    let url = config
        .database
        .url
        .as_deref()
        .ok_or(StartupError::MissingDatabaseUrl)?;
    let manager = PgManager::from_url(url).map_err(StartupError::DatabaseUrl)?;
    tracing::info!(database = %manager.masked_url(), "Initializing connection pool");
    let pool = Pool::initialize(manager, PoolConfig::from_config(&config.database)).await;

    let tokens = TokenCodec::from_config(&config.auth)?;

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let address = config.server.bind_address.clone();
    let listener = TcpListener::bind(&address)
        .await
        .map_err(|source| StartupError::Bind { address, source })?;

    let state = AppState::new(config, pool, tokens);
    Ok((HttpServer::new(state), listener))
}
