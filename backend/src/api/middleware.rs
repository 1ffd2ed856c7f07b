use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::monitoring::{RequestScope, UserContext};
use crate::services::auth::Claims;
use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use std::sync::Arc;

pub struct RequireAuth(pub Claims);

#[async_trait]
impl FromRequestParts<Arc<AppState>> for RequireAuth {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self> {
        let token = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or(AppError::Unauthorized)?;

        let claims = state.auth_service.verify_token(token)?;

        // Lets the monitoring hook attribute errors to the caller
        if let Some(scope) = parts.extensions.get::<RequestScope>() {
            scope.set_user(UserContext {
                id: Some(claims.sub.clone()),
                tenant_id: claims.tenant_id.clone(),
            });
        }

        Ok(RequireAuth(claims))
    }
}

pub async fn rate_limit(
    State(state): State<Arc<AppState>>,
    req: Request,
    next: Next,
) -> Result<Response> {
    if state.rate_limiter.check().is_err() {
        tracing::debug!("Rate limit exceeded for {}", req.uri().path());
        return Err(AppError::RateLimited);
    }
    Ok(next.run(req).await)
}
