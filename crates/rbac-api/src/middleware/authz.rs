//! Bearer token + casbin enforcement for `/api/v1` routes

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::ApiError;
use crate::extract::CurrentUser;
use crate::state::AppState;

pub async fn authorize(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let authz = &state.config.authz;
    let path = request.uri().path().to_string();

    if authz.skip_paths.iter().any(|p| path.starts_with(p.as_str())) {
        debug!(%path, "Authorization skipped");
        return Ok(next.run(request).await);
    }

    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthorized("Missing bearer token".to_string()))?;
    let claims = state
        .jwt
        .validate_token(token)
        .map_err(|e| ApiError::Unauthorized(e.to_string()))?;

    let subject = claims.sub;
    let method = request.method().as_str().to_string();

    if authz.root_user.as_deref() != Some(subject.as_str()) {
        let allowed = state
            .enforcer
            .enforce(&subject, &path, &method)
            .await
            .map_err(|e| ApiError::InternalError(format!("Authorization engine failed: {}", e)))?;

        if !allowed {
            warn!(user = %subject, %path, %method, "Access denied");
            return Err(ApiError::Forbidden(format!("{} {}", method, path)));
        }
    }

    request.extensions_mut().insert(CurrentUser {
        id: Uuid::parse_str(&subject).ok(),
        subject,
    });
    Ok(next.run(request).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
}
