use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use shop_core::{CreatedIntent, OrderId, Settlement};
use tracing::instrument;

#[derive(Debug, Deserialize)]
pub struct CreatePayment {
    pub order_id: OrderId,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePayment {
    /// `succeeded` or `failed`
    pub status: String,
}

#[instrument(skip(state, request), fields(user_id = %identity.user_id, order_id = %request.order_id))]
pub async fn create(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(request): AppJson<CreatePayment>,
) -> ApiResult<(StatusCode, Json<CreatedIntent>)> {
    let created = state
        .payments
        .create_intent(identity.user_id, request.order_id)
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// Client-reported outcome; `payment_id` is the gateway's id
pub async fn update(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(payment_id): AppPath<String>,
    AppJson(request): AppJson<UpdatePayment>,
) -> ApiResult<Json<Settlement>> {
    Ok(Json(
        state
            .payments
            .confirm(identity, &payment_id, &request.status)
            .await?,
    ))
}
