mod api;
mod config;
mod error;
mod monitoring;
mod services;

use crate::api::AppState;
use crate::config::Config;
use crate::services::{AuthService, CatalogStore};
use axum::http::{header, HeaderValue, Method};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,pubflow_server=debug".into());
    if config.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
    tracing::info!("Configuration loaded");

    monitoring::initialize();

    let catalog = match &config.catalog_seed_path {
        Some(path) => {
            let mut span = monitoring::start_span("catalog.seed", "startup");
            span.set_attribute("path", path.as_str());
            match CatalogStore::from_seed_file(path).await {
                Ok(store) => {
                    span.finish();
                    store
                }
                Err(e) => {
                    span.set_status(monitoring::SpanStatus::InternalError);
                    span.finish();
                    monitoring::capture_exception(
                        &*e,
                        monitoring::CaptureContext::default().tag("phase", "startup"),
                    );
                    monitoring::close(Duration::from_secs(2)).await;
                    return Err(e);
                }
            }
        }
        None => CatalogStore::new(),
    };

    let app_state = Arc::new(AppState::new(
        Arc::new(AuthService::new(&config)),
        Arc::new(catalog),
        config.rate_limit_per_second,
    ));

    let app = api::router(app_state).layer(cors_layer(&config.cors_origins));

    let addr = format!("{}:{}", config.server_host, config.server_port);
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    monitoring::close(Duration::from_secs(2)).await;
    tracing::info!("Server stopped");

    Ok(())
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if origins.iter().any(|o| o == "*") {
        return layer.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid CORS origin: {}", o);
                None
            }
        })
        .collect();
    layer.allow_origin(origins)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
