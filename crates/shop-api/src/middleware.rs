//! Route guards.
//!
//! `require_auth` verifies the Bearer access token and stores the caller's
//! [`Identity`] in request extensions; `require_admin` runs after it and
//! checks the role.

use crate::error::ApiError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use shop_core::{Identity, ShopError};
use tracing::debug;

fn bearer_token(request: &Request) -> Result<&str, ShopError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| ShopError::Unauthorized("Missing bearer token".into()))?;
    header
        .to_str()
        .ok()
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| ShopError::Unauthorized("Malformed authorization header".into()))
}

pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let identity = state.auth.authenticate(bearer_token(&request)?)?;
    debug!(user_id = %identity.user_id, role = %identity.role, "Authenticated request");
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    match request.extensions().get::<Identity>() {
        Some(identity) if identity.is_admin() => Ok(next.run(request).await),
        Some(_) => Err(ShopError::Forbidden("Admin access required".into()).into()),
        None => Err(ShopError::Unauthorized("Authentication required".into()).into()),
    }
}
