use super::message;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use shop_core::{ProductId, WishlistItem, WishlistLine};

#[derive(Debug, Deserialize)]
pub struct AddToWishlist {
    pub product_id: ProductId,
}

pub async fn list(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ApiResult<Json<Vec<WishlistLine>>> {
    Ok(Json(state.wishlist.list(identity.user_id).await?))
}

pub async fn add(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(request): AppJson<AddToWishlist>,
) -> ApiResult<(StatusCode, Json<WishlistItem>)> {
    let item = state
        .wishlist
        .add(identity.user_id, request.product_id)
        .await?;
    Ok((StatusCode::CREATED, Json(item)))
}

pub async fn remove(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppPath(product_id): AppPath<ProductId>,
) -> ApiResult<Json<Value>> {
    state.wishlist.remove(identity.user_id, product_id).await?;
    Ok(message("Removed from wishlist"))
}
