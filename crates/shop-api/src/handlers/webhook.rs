use crate::error::ApiResult;
use crate::state::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde_json::{json, Value};
use shop_core::ShopError;
use tracing::{error, info};

/// Stripe webhook; the raw body is needed for signature verification
pub async fn stripe(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> ApiResult<Json<Value>> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ShopError::validation("Missing Stripe-Signature header"))?;

    let settlement = state
        .payments
        .handle_webhook("stripe", &body, signature)
        .await
        .inspect_err(|e| error!(error = %e, "Webhook rejected"))?;

    match &settlement {
        Some(s) => info!(
            order_id = %s.order.id,
            order_status = %s.order.status.as_str(),
            "Webhook settled payment"
        ),
        None => info!("Webhook acknowledged without changes"),
    }

    Ok(Json(json!({ "received": true })))
}
