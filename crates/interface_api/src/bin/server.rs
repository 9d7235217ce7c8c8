//! LX1 Update Replay - API Server Binary
//!
//! Serves the update ledger API and runs the periodic replay.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin lx-replay-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... API_REPLAY_INTERVAL_SECS=30 cargo run --bin lx-replay-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string (`DATABASE_URL` is also read)
//! * `API_DB_MAX_CONNECTIONS` - Connection pool size (default: 10)
//! * `API_DB_CONNECT_TIMEOUT_SECS` - Wait for a pooled connection (default: 30)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)
//! * `API_REPLAY_INTERVAL_SECS` - Seconds between scheduled replays, 0 disables (default: 60)
//! * `API_CLAIM_LEASE_SECS` - Claim lease while a handler runs (default: 300)
//!
//! Object-type handlers are registered by the deployment that embeds this
//! service through `domain_replay::install_global`. Without an installed
//! registry the server still serves the ledger, but the scheduler stays off
//! and the replay endpoints answer `503 service_unavailable`.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_replay::HandlerRegistry;
use infra_db::{create_pool, run_migrations};
use interface_api::{config::ApiConfig, create_router, scheduler::ReplayScheduler, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config();
    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting LX1 update replay API server"
    );

    let pool = create_pool(config.database_config())
        .await
        .context("connecting to the database")?;
    run_migrations(&pool).await.context("applying migrations")?;

    let registry = match domain_replay::global() {
        Some(registry) => registry,
        None => {
            tracing::warn!("No handler registry installed; replay endpoints answer 503");
            Arc::new(HandlerRegistry::default())
        }
    };
    let replay_enabled = !registry.is_empty();

    let state = AppState::postgres(pool, registry, config.clone());

    let scheduler = match config.replay_interval() {
        Some(period) if replay_enabled => {
            Some(ReplayScheduler::spawn(state.engine.clone(), period))
        }
        _ => {
            tracing::info!("Replay scheduler disabled");
            None
        }
    };

    let app = create_router(state);
    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    if let Some(scheduler) = scheduler {
        scheduler.shutdown().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration, falling back to defaults when the environment
/// cannot be parsed
fn load_config() -> ApiConfig {
    let mut config = ApiConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Invalid API_ configuration ({}), using defaults", e);
        ApiConfig::default()
    });

    if std::env::var("API_DATABASE_URL").is_err() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
    }

    config
}

/// Initializes the tracing subscriber for structured logging
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
