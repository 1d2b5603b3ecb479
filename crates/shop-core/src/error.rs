//! # Error Types
//!
//! Typed error handling for the storefront.
//! Every workflow returns `Result<T, ShopError>`; the HTTP layer turns the
//! variant into a status code and a JSON body.

use thiserror::Error;

/// Core error type for all storefront operations
#[derive(Debug, Error)]
pub enum ShopError {
    /// Malformed or missing input
    #[error("Validation error: {0}")]
    Validation(String),

    /// Missing or soft-deleted entity
    #[error("{0} not found")]
    NotFound(String),

    /// Duplicate email, wishlist line, pending payment, ...
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Missing, invalid or expired credential; also ownership mismatch on orders
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Valid credential without the required role or ownership
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Requested quantity exceeds available stock
    #[error("Insufficient stock for product: {product}")]
    InsufficientStock { product: String },

    /// State machine transition rejected
    #[error("Invalid status: {0}")]
    InvalidStatus(String),

    /// OTP exists but is past its expiry instant
    #[error("OTP expired")]
    OtpExpired,

    /// OTP exists but the presented code differs
    #[error("Invalid OTP")]
    OtpMismatch,

    /// Email or payment gateway call failed
    #[error("Upstream failure [{service}]: {message}")]
    Upstream { service: String, message: String },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Persistent store failure
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal error (should not happen)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ShopError {
    pub fn not_found(entity: impl Into<String>) -> Self {
        ShopError::NotFound(entity.into())
    }

    pub fn validation(message: impl Into<String>) -> Self {
        ShopError::Validation(message.into())
    }

    pub fn upstream(service: impl Into<String>, message: impl Into<String>) -> Self {
        ShopError::Upstream {
            service: service.into(),
            message: message.into(),
        }
    }

    /// Returns the HTTP status code appropriate for this error
    pub fn status_code(&self) -> u16 {
        match self {
            ShopError::Validation(_) => 400,
            ShopError::NotFound(_) => 404,
            ShopError::Conflict(_) => 409,
            ShopError::Unauthorized(_) => 401,
            ShopError::Forbidden(_) => 403,
            ShopError::InsufficientStock { .. } => 409,
            ShopError::InvalidStatus(_) => 400,
            ShopError::OtpExpired => 400,
            ShopError::OtpMismatch => 400,
            ShopError::Upstream { .. } => 502,
            ShopError::Configuration(_) => 500,
            ShopError::Storage(_) => 500,
            ShopError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error kind
    pub fn kind(&self) -> &'static str {
        match self {
            ShopError::Validation(_) => "validation_error",
            ShopError::NotFound(_) => "not_found",
            ShopError::Conflict(_) => "conflict",
            ShopError::Unauthorized(_) => "unauthorized",
            ShopError::Forbidden(_) => "forbidden",
            ShopError::InsufficientStock { .. } => "insufficient_stock",
            ShopError::InvalidStatus(_) => "invalid_status",
            ShopError::OtpExpired => "otp_expired",
            ShopError::OtpMismatch => "otp_mismatch",
            ShopError::Upstream { .. } => "upstream_failure",
            ShopError::Configuration(_) => "configuration_error",
            ShopError::Storage(_) => "storage_error",
            ShopError::Internal(_) => "internal_error",
        }
    }

    /// Server-side faults hide their message from clients
    pub fn is_server_error(&self) -> bool {
        self.status_code() >= 500
    }
}

/// Result type alias for storefront operations
pub type ShopResult<T> = Result<T, ShopError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(ShopError::validation("bad").status_code(), 400);
        assert_eq!(ShopError::not_found("Product").status_code(), 404);
        assert_eq!(
            ShopError::InsufficientStock {
                product: "Mug".into()
            }
            .status_code(),
            409
        );
        assert_eq!(ShopError::Unauthorized("x".into()).status_code(), 401);
        assert_eq!(ShopError::Forbidden("x".into()).status_code(), 403);
        assert_eq!(ShopError::upstream("smtp", "down").status_code(), 502);
    }

    #[test]
    fn test_insufficient_stock_names_product() {
        let err = ShopError::InsufficientStock {
            product: "Blue Mug".into(),
        };
        assert_eq!(err.to_string(), "Insufficient stock for product: Blue Mug");
        assert_eq!(err.kind(), "insufficient_stock");
    }

    #[test]
    fn test_server_errors() {
        assert!(ShopError::Storage("pool closed".into()).is_server_error());
        assert!(!ShopError::OtpExpired.is_server_error());
    }
}
