pub mod auth;
pub mod catalog;
pub mod middleware;

pub use auth::auth_routes;
pub use catalog::catalog_routes;

use crate::monitoring;
use crate::services::{AuthService, CatalogStore};
use axum::{middleware::from_fn, middleware::from_fn_with_state, routing::get, Json, Router};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde_json::{json, Value};
use std::num::NonZeroU32;
use std::sync::Arc;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};

pub struct AppState {
    pub auth_service: Arc<AuthService>,
    pub catalog: Arc<CatalogStore>,
    pub rate_limiter: DefaultDirectRateLimiter,
}

impl AppState {
    pub fn new(auth_service: Arc<AuthService>, catalog: Arc<CatalogStore>, per_second: u32) -> Self {
        let per_second = NonZeroU32::new(per_second).unwrap_or(NonZeroU32::MIN);
        Self {
            auth_service,
            catalog,
            rate_limiter: RateLimiter::direct(Quota::per_second(per_second)),
        }
    }
}

/// Full application router, minus CORS which depends on deployment config.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest(
            "/api/v1",
            Router::new()
                .merge(auth_routes())
                .merge(catalog_routes())
                .layer(from_fn_with_state(state.clone(), middleware::rate_limit))
                .with_state(state),
        )
        .layer(CatchPanicLayer::custom(monitoring::panic_response))
        .layer(from_fn(monitoring::track_requests))
        .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "monitoring": monitoring::is_enabled(),
    }))
}
