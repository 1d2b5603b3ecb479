//! # shop-api
//!
//! HTTP API layer for storefront-rs.
//!
//! This crate provides:
//! - Axum-based HTTP server with bearer-token and admin guards
//! - REST endpoints for auth, catalog, cart, wishlist, orders and payments
//! - The Stripe webhook receiver
//! - SMTP delivery for OTP emails
//! - Startup seeding of an admin account and a demo catalog
//!
//! ## Endpoints
//!
//! | Method | Path | Guard |
//! |--------|------|-------|
//! | GET | `/health` | |
//! | POST | `/auth/{signup,login,refresh,logout}` | refresh cookie for the last two |
//! | POST | `/auth/{send-otp,resend-otp,verify-otp}` | |
//! | POST | `/auth/{forgot-password,reset-password}` | |
//! | GET | `/products`, `/products/{id}` | |
//! | GET, PUT | `/user/profile` | bearer |
//! | GET, POST | `/cart`; PUT, DELETE `/cart/{item_id}` | bearer |
//! | GET, POST | `/wishlist`; DELETE `/wishlist/{product_id}` | bearer |
//! | GET, POST | `/order`; GET, DELETE `/order/{id}` | bearer |
//! | POST | `/payments/create`; PUT `/payments/{payment_id}/update` | bearer |
//! | * | `/admin/products/...`, `/admin/orders/...`, `/admin/users/...` | admin |
//! | POST | `/webhook/stripe` | Stripe signature |

pub mod config;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod mailer;
pub mod middleware;
pub mod routes;
pub mod seed;
pub mod state;

pub use config::AppConfig;
pub use error::{ApiError, ErrorResponse};
pub use routes::create_router;
pub use state::AppState;
