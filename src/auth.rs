//! Bearer token check for operator endpoints.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;

use crate::config::AppConfig;
use crate::error::ApiError;
use crate::AppState;

/// Identity of the authenticated operator, available to handlers as an
/// `Extension` once [`require_operator`] has run.
#[derive(Debug, Clone)]
pub struct Operator(pub String);

/// Middleware for operator routes. The token must be sent as
/// `Authorization: Bearer <token>` and match `operator_token`; with no token
/// configured every request is rejected.
pub async fn require_operator(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let operator = authorize(request.headers(), &state.config)?;
    request.extensions_mut().insert(Operator(operator));
    Ok(next.run(request).await)
}

fn authorize(headers: &HeaderMap, config: &AppConfig) -> Result<String, ApiError> {
    let Some(expected) = config.operator_token.as_deref() else {
        tracing::debug!("operator token not configured");
        return Err(ApiError::Unauthorized);
    };
    let provided = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim);
    if provided == Some(expected) {
        Ok(config.operator_name.clone())
    } else {
        tracing::debug!("missing or invalid operator token");
        Err(ApiError::Unauthorized)
    }
}
