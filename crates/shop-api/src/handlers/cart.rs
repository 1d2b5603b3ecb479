use super::message;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use shop_core::{CartItem, CartItemId, CartView, ProductId};

#[derive(Debug, Deserialize)]
pub struct AddToCart {
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct UpdateQuantity {
    pub quantity: i32,
}

pub async fn view(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ApiResult<Json<CartView>> {
    Ok(Json(state.cart.view(identity.user_id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(request): AppJson<AddToCart>,
) -> ApiResult<(StatusCode, Json<CartItem>)> {
    let item = state
        .cart
        .add(identity.user_id, request.product_id, request.quantity)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn update(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(item_id): AppPath<CartItemId>,
    AppJson(request): AppJson<UpdateQuantity>,
) -> ApiResult<Json<CartItem>> {
    Ok(Json(
        state
            .cart
            .update(identity.user_id, item_id, request.quantity)
            .await?,
    ))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(item_id): AppPath<CartItemId>,
) -> ApiResult<Json<Value>> {
    state.cart.remove(identity.user_id, item_id).await?;
    Ok(message("Item removed from cart"))
}
