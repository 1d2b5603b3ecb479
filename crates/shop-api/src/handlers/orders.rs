//! Checkout, order history and admin order management.

use super::message;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use shop_core::{Order, OrderId};
use tracing::instrument;

#[derive(Debug, Default, Deserialize)]
pub struct PlaceOrder {
    /// Falls back to the profile address when absent or blank
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateOrderStatus {
    pub status: String,
}

#[instrument(skip(state, request), fields(user_id = %identity.user_id))]
pub async fn place(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(request): AppJson<PlaceOrder>,
) -> ApiResult<(StatusCode, Json<Order>)> {
    let order = state
        .orders
        .place(identity.user_id, request.address.as_deref())
        .await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_mine(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_mine(identity.user_id).await?))
}

pub async fn get(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(id): AppPath<OrderId>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.get_for(identity, id).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(id): AppPath<OrderId>,
) -> ApiResult<Json<Value>> {
    state.orders.delete(identity.user_id, id).await?;
    Ok(message("Order deleted"))
}

pub async fn list_all(State(state): State<AppState>) -> ApiResult<Json<Vec<Order>>> {
    Ok(Json(state.orders.list_all().await?))
}

pub async fn update_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<OrderId>,
    AppJson(request): AppJson<UpdateOrderStatus>,
) -> ApiResult<Json<Order>> {
    Ok(Json(state.orders.update_status(id, &request.status).await?))
}
