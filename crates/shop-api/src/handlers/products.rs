//! Public catalog and the admin product and production endpoints.

use super::message;
use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath};
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde_json::Value;
use shop_core::{
    NewProduct, Product, ProductId, ProductPatch, ProductionRecord, ProductionView,
};

#[derive(Debug, Deserialize)]
pub struct ProductionStatusUpdate {
    pub status: String,
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<Product>>> {
    Ok(Json(state.catalog.list().await?))
}

pub async fn get(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.catalog.get(id).await?))
}

pub async fn create(
    State(state): State<AppState>,
    AppJson(new): AppJson<NewProduct>,
) -> ApiResult<(StatusCode, Json<Product>)> {
    let product = state.catalog.create(new).await?;
    Ok((StatusCode::CREATED, Json(product)))
}

pub async fn update(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
    AppJson(patch): AppJson<ProductPatch>,
) -> ApiResult<Json<Product>> {
    Ok(Json(state.catalog.update(id, patch).await?))
}

pub async fn delete(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> ApiResult<Json<Value>> {
    state.catalog.delete(id).await?;
    Ok(message("Product deleted"))
}

pub async fn start_production(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> ApiResult<(StatusCode, Json<ProductionRecord>)> {
    let record = state.catalog.start_production(id).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

pub async fn production(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
) -> ApiResult<Json<ProductionView>> {
    Ok(Json(state.catalog.production(id).await?))
}

pub async fn productions(State(state): State<AppState>) -> ApiResult<Json<Vec<ProductionView>>> {
    Ok(Json(state.catalog.productions().await?))
}

pub async fn update_production_status(
    State(state): State<AppState>,
    AppPath(id): AppPath<ProductId>,
    AppJson(update): AppJson<ProductionStatusUpdate>,
) -> ApiResult<Json<ProductionRecord>> {
    Ok(Json(
        state
            .catalog
            .update_production_status(id, &update.status)
            .await?,
    ))
}
