//! Categories API server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  CATEGORIES API                   │
//!                         │                                                   │
//!     Client Request      │  ┌─────────┐    ┌───────────┐    ┌────────────┐   │
//!     ────────────────────┼─▶│  http   │───▶│ auth gate │───▶│  handlers  │   │
//!                         │  │ layers  │    │  (JWT)    │    │ validation │   │
//!                         │  └─────────┘    └───────────┘    └─────┬──────┘   │
//!                         │                                        │          │
//!                         │                                        ▼          │
//!                         │                 ┌───────────┐    ┌────────────┐   │
//!     Client Response     │                 │   store   │◀───│  db pool   │◀──┼──── PostgreSQL
//!     ◀───────────────────┼─────────────────│  (sqlx)   │    │ retry/lease│   │
//!                         │                 └───────────┘    └────────────┘   │
//!                         │                                                   │
//!                         │  config · observability · resilience · lifecycle  │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use categories_api::config::{load_config, ConfigError};
use categories_api::lifecycle::{self, signals, Shutdown};
use categories_api::observability::logging;

#[derive(Parser, Debug)]
#[command(name = "categories-api", version, about = "Categories REST API server")]
struct Args {
    /// Path to a TOML config file. Environment variables override it.
    #[arg(short, long, env = "CATEGORIES_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(ConfigError::Validation(errors)) => {
            eprintln!("invalid configuration:");
            for error in &errors {
                eprintln!("  - {error}");
            }
            std::process::exit(2);
        }
        Err(e) => return Err(e.into()),
    };

    logging::init(&config.observability);
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        environment = %config.environment,
        bind_address = %config.server.bind_address,
        request_timeout_secs = config.server.request_timeout_secs,
        "categories-api starting"
    );

    let (server, listener) = lifecycle::start(config).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Arc::new(Shutdown::new());
    let rx = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown.clone());

    server.run(listener, rx).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
