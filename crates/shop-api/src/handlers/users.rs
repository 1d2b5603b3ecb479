//! Profile self-service and admin user management.

use crate::error::ApiResult;
use crate::extract::{AppJson, AppPath, CurrentUser};
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use shop_core::{AdminUserUpdate, ProfileUpdate, User, UserId};

pub async fn profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.profile(identity.user_id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(identity): CurrentUser,
    AppJson(update): AppJson<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.update_profile(identity.user_id, update).await?))
}

pub async fn list(State(state): State<AppState>) -> ApiResult<Json<Vec<User>>> {
    Ok(Json(state.users.list().await?))
}

pub async fn admin_update(
    State(state): State<AppState>,
    AppPath(id): AppPath<UserId>,
    AppJson(update): AppJson<AdminUserUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.admin_update(id, update).await?))
}

pub async fn block(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    AppPath(id): AppPath<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.set_blocked(admin.user_id, id, true).await?))
}

pub async fn unblock(
    State(state): State<AppState>,
    CurrentUser(admin): CurrentUser,
    AppPath(id): AppPath<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.users.set_blocked(admin.user_id, id, false).await?))
}
