use crate::api::middleware::RequireAuth;
use crate::api::AppState;
use crate::error::{AppError, Result};
use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use pubflow_shared::{DataSource, Track, TrackStatus};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
struct TrackQuery {
    status: Option<String>,
}

pub fn catalog_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/catalog/tracks", get(list_tracks))
        .route("/catalog/tracks/:id", get(get_track))
        .route("/data-sources", get(list_data_sources))
        .route("/data-sources/:id", get(get_data_source))
}

async fn list_tracks(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Query(query): Query<TrackQuery>,
) -> Result<Json<Vec<Track>>> {
    let status = query
        .status
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::parse::<TrackStatus>)
        .transpose()
        .map_err(AppError::Validation)?;

    Ok(Json(state.catalog.list_tracks(status).await))
}

async fn get_track(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<Track>> {
    state
        .catalog
        .get_track(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Track not found".to_string()))
}

async fn list_data_sources(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
) -> Result<Json<Vec<DataSource>>> {
    Ok(Json(state.catalog.list_data_sources().await))
}

async fn get_data_source(
    State(state): State<Arc<AppState>>,
    RequireAuth(_): RequireAuth,
    Path(id): Path<String>,
) -> Result<Json<DataSource>> {
    state
        .catalog
        .get_data_source(&id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound("Data source not found".to_string()))
}
