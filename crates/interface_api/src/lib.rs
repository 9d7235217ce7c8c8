//! HTTP API Layer
//!
//! REST API over the update ledger and the replay engine, using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: request handlers for health and updates
//! - **Middleware**: JWT authentication and audit logging
//! - **DTOs**: request/response bodies
//! - **Scheduler**: periodic `execute_all`
//! - **Error Handling**: consistent JSON error responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::{create_router, AppState};
//!
//! let state = AppState::postgres(pool, registry, config);
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;
pub mod auth;
pub mod scheduler;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tower_http::cors::{CorsLayer, Any};

use core_kernel::HealthCheckable;
use domain_replay::{HandlerRegistry, ReplayEngine};
use domain_update::{
    FileCompletionTracker, IncomingFileStore, SequenceGenerator, UpdateLedger, UpdateStore,
};
use infra_db::{
    DatabasePool, PostgresIncomingFileStore, PostgresSequenceGenerator, PostgresUpdateStore,
};

use crate::config::ApiConfig;
use crate::middleware::{auth_middleware, audit_middleware};
use crate::handlers::{health, updates};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: UpdateLedger,
    pub engine: ReplayEngine,
    /// Probed by the readiness check
    pub health: Arc<dyn HealthCheckable>,
    pub config: ApiConfig,
}

impl AppState {
    /// Wires the ledger and the engine over the given adapters
    pub fn new<S>(
        store: Arc<S>,
        sequences: Arc<dyn SequenceGenerator>,
        files: Arc<dyn IncomingFileStore>,
        registry: Arc<HandlerRegistry>,
        config: ApiConfig,
    ) -> Self
    where
        S: UpdateStore,
    {
        let ledger = UpdateLedger::new(store.clone(), sequences, files.clone());
        let tracker = Arc::new(FileCompletionTracker::new(store.clone(), files));
        let engine = ReplayEngine::new(ledger.clone(), registry, tracker, config.replay_config());
        Self {
            ledger,
            engine,
            health: store,
            config,
        }
    }

    /// State backed by the PostgreSQL adapters
    pub fn postgres(pool: DatabasePool, registry: Arc<HandlerRegistry>, config: ApiConfig) -> Self {
        Self::new(
            Arc::new(PostgresUpdateStore::new(pool.clone())),
            Arc::new(PostgresSequenceGenerator::new(pool.clone())),
            Arc::new(PostgresIncomingFileStore::new(pool)),
            registry,
            config,
        )
    }
}

/// Creates the main API router
pub fn create_router(state: AppState) -> Router {
    // Public routes (no auth required)
    let public_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let update_routes = Router::new()
        .route("/", get(updates::list_updates))
        .route("/execute", post(updates::execute_updates))
        .route("/execute_all", post(updates::execute_all_updates))
        .route("/:id", get(updates::get_update).delete(updates::delete_update));

    // Protected API routes
    let api_routes = Router::new()
        .nest("/updates", update_routes)
        .layer(axum_middleware::from_fn_with_state(state.clone(), audit_middleware))
        .layer(axum_middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .merge(public_routes)
        .nest("/api/v1", api_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                ),
        )
        .with_state(state)
}
