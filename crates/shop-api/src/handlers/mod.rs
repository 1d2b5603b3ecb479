//! # Request Handlers
//!
//! One module per resource. Handlers parse the request, call a service and
//! shape the JSON response; every rule lives in `shop-core`.

pub mod auth;
pub mod cart;
pub mod health;
pub mod orders;
pub mod payments;
pub mod products;
pub mod users;
pub mod webhook;
pub mod wishlist;

use axum::Json;
use serde_json::{json, Value};

/// `{"message": ...}` acknowledgement body
pub(crate) fn message(text: &str) -> Json<Value> {
    Json(json!({ "message": text }))
}
