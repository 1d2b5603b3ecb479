use crate::error::ApiResult;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

/// Health check; fails when the store is unreachable
pub async fn health(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    state.store.ping().await?;
    Ok(Json(json!({
        "status": "healthy",
        "service": "storefront",
        "version": env!("CARGO_PKG_VERSION"),
        "store": state.store.backend(),
        "mailer": state.mailer.transport_name(),
        "payment_providers": state.payments.gateways().providers(),
    })))
}
