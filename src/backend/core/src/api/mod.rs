//! HTTP layer for the panel.
//!
//! - `/health` and `/metrics` (public, unversioned)
//! - `/api/application/*` read endpoints, behind API key authentication
//!
//! # Example
//!
//! ```rust,ignore
//! let state = AppState::new(repository, keys, &config);
//! let app = build_router(state);
//! ```

pub mod application;
mod handlers;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::config::{ApiConfig, Config};
use crate::db::ResourceRepository;
use crate::middleware::{ApiKeyStore, AuthLayer};

/// Prefix of the application API.
pub const APPLICATION_PREFIX: &str = "/api/application";

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub repository: Arc<dyn ResourceRepository>,
    pub keys: Arc<ApiKeyStore>,
    pub api: ApiConfig,
    /// Externally visible base URL for pagination links
    pub public_url: String,
}

impl AppState {
    pub fn new(repository: Arc<dyn ResourceRepository>, keys: Arc<ApiKeyStore>, config: &Config) -> Self {
        Self {
            repository,
            keys,
            api: config.api.clone(),
            public_url: config.server.public_url.clone(),
        }
    }
}

/// Build the API router.
///
/// Authentication wraps every route; `/health` and `/metrics` are public
/// paths and pass straight through.
pub fn build_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::prometheus_metrics))
        .nest(APPLICATION_PREFIX, application::router())
        .fallback(handlers::not_found)
        .layer(AuthLayer::new(state.keys.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
