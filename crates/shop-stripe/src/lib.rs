//! # shop-stripe
//!
//! Stripe payment gateway for the storefront backend.
//!
//! ## Features
//! - PaymentIntents for order totals, with per-order idempotency keys
//! - Webhook signature verification (`Stripe-Signature`, HMAC-SHA256)
//! - `payment_intent.succeeded` / `payment_intent.payment_failed` mapping
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shop_stripe::StripePaymentGateway;
//! use shop_core::GatewaySelector;
//! use std::sync::Arc;
//!
//! let stripe = StripePaymentGateway::from_env()?;
//! let gateways = GatewaySelector::default().with_gateway(Arc::new(stripe));
//! ```

pub mod config;
pub mod intent;
pub mod webhook;

pub use config::StripeConfig;
pub use intent::StripePaymentGateway;
pub use webhook::{parse_event, sign_payload, verify_signature, REQUIRED_WEBHOOK_EVENTS};
