use crate::api::middleware::RequireAuth;
use crate::api::AppState;
use axum::{routing::get, Json, Router};
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub user_id: String,
    pub tenant_id: Option<String>,
    pub expires_at: i64,
}

pub fn auth_routes() -> Router<Arc<AppState>> {
    Router::new().route("/me", get(me))
}

async fn me(RequireAuth(claims): RequireAuth) -> Json<Identity> {
    Json(Identity {
        user_id: claims.sub,
        tenant_id: claims.tenant_id,
        expires_at: claims.exp,
    })
}
