//! Signup, login, refresh-token cookie and OTP endpoints.

use super::message;
use crate::error::ApiResult;
use crate::extract::AppJson;
use crate::state::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::Value;
use shop_core::{SessionTokens, ShopError, SignupRequest, User};
use tracing::instrument;

pub const REFRESH_COOKIE: &str = "refresh_token";

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct OtpRequest {
    pub email: String,
    pub purpose: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
    pub purpose: String,
}

#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

fn refresh_cookie(state: &AppState, value: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, value))
        .http_only(true)
        .secure(state.config.is_production())
        .same_site(SameSite::Strict)
        .path("/")
        .max_age(time::Duration::seconds(
            state.config.refresh_token_ttl.num_seconds(),
        ))
        .build()
}

fn with_session(state: &AppState, jar: CookieJar, tokens: SessionTokens) -> (CookieJar, Json<SessionTokens>) {
    let jar = jar.add(refresh_cookie(state, tokens.refresh_token.clone()));
    (jar, Json(tokens))
}

#[instrument(skip(state, request))]
pub async fn signup(
    State(state): State<AppState>,
    AppJson(request): AppJson<SignupRequest>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.auth.signup(request).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

#[instrument(skip(state, jar, request), fields(email = %request.email))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    AppJson(request): AppJson<LoginRequest>,
) -> ApiResult<(CookieJar, Json<SessionTokens>)> {
    let tokens = state.auth.login(&request.email, &request.password).await?;
    Ok(with_session(&state, jar, tokens))
}

pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<SessionTokens>)> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ShopError::Unauthorized("Refresh token missing".into()))?;
    let tokens = state.auth.refresh(&presented).await?;
    Ok(with_session(&state, jar, tokens))
}

pub async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<Value>)> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ShopError::validation("No refresh token to revoke"))?;
    state.auth.logout(&presented).await?;
    let jar = jar.remove(Cookie::build(REFRESH_COOKIE).path("/"));
    Ok((jar, message("Logged out")))
}

pub async fn send_otp(
    State(state): State<AppState>,
    AppJson(request): AppJson<OtpRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.send_otp(&request.email, &request.purpose).await?;
    Ok(message("OTP sent"))
}

pub async fn resend_otp(
    State(state): State<AppState>,
    AppJson(request): AppJson<OtpRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.resend_otp(&request.email, &request.purpose).await?;
    Ok(message("OTP resent"))
}

pub async fn verify_otp(
    State(state): State<AppState>,
    AppJson(request): AppJson<VerifyOtpRequest>,
) -> ApiResult<Json<Value>> {
    state
        .auth
        .verify_otp(&request.email, &request.otp, &request.purpose)
        .await?;
    Ok(message("OTP verified"))
}

pub async fn forgot_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<EmailRequest>,
) -> ApiResult<Json<Value>> {
    state.auth.forgot_password(&request.email).await?;
    Ok(message("Password reset code sent"))
}

pub async fn reset_password(
    State(state): State<AppState>,
    AppJson(request): AppJson<ResetPasswordRequest>,
) -> ApiResult<Json<Value>> {
    state
        .auth
        .reset_password(&request.email, &request.otp, &request.new_password)
        .await?;
    Ok(message("Password updated"))
}
