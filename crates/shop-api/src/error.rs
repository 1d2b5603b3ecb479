//! JSON error responses.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shop_core::ShopError;
use tracing::error;

/// Body of every non-2xx response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: u16) -> Self {
        Self {
            error: error.into(),
            code,
            details: None,
        }
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }
}

/// Handler error: a `ShopError` plus optional detail for the client
#[derive(Debug)]
pub struct ApiError {
    inner: ShopError,
    details: Option<String>,
}

pub type ApiResult<T> = Result<T, ApiError>;

impl ApiError {
    pub fn inner(&self) -> &ShopError {
        &self.inner
    }
}

impl From<ShopError> for ApiError {
    fn from(inner: ShopError) -> Self {
        Self {
            inner,
            details: None,
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            inner: ShopError::validation("Invalid request body"),
            details: Some(rejection.body_text()),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self {
            inner: ShopError::validation("Invalid path parameter"),
            details: Some(rejection.body_text()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = self.inner.status_code();
        let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Storage and configuration messages stay in the logs
        let body = if status.is_server_error() && !matches!(self.inner, ShopError::Upstream { .. }) {
            error!(error = %self.inner, "Request failed");
            ErrorResponse::new("Internal server error", code)
        } else {
            let mut body = ErrorResponse::new(self.inner.to_string(), code);
            body.details = self.details;
            body
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (ShopError::validation("x"), StatusCode::BAD_REQUEST),
            (ShopError::not_found("Product"), StatusCode::NOT_FOUND),
            (ShopError::Unauthorized("x".into()), StatusCode::UNAUTHORIZED),
            (ShopError::Forbidden("x".into()), StatusCode::FORBIDDEN),
            (
                ShopError::InsufficientStock {
                    product: "Mug".into(),
                },
                StatusCode::CONFLICT,
            ),
            (ShopError::upstream("stripe", "down"), StatusCode::BAD_GATEWAY),
            (ShopError::Storage("pool".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];
        for (err, expected) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), expected);
        }
    }

    #[test]
    fn test_error_response_details_skipped_when_absent() {
        let json = serde_json::to_value(ErrorResponse::new("Mug not found", 404)).unwrap();
        assert_eq!(json["code"], 404);
        assert!(json.get("details").is_none());

        let json =
            serde_json::to_value(ErrorResponse::new("bad", 400).with_details("missing field")).unwrap();
        assert_eq!(json["details"], "missing field");
    }
}
