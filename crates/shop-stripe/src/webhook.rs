//! # Stripe Webhook Handling
//!
//! Signature verification and event parsing for `POST /webhook/stripe`.
//!
//! Stripe signs `"{timestamp}.{raw body}"` with HMAC-SHA256 under the
//! endpoint's `whsec_...` secret and sends the result in the
//! `Stripe-Signature` header as `t=<unix>,v1=<hex>[,v1=<hex>...]`.

use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;
use shop_core::{GatewayEvent, GatewayEventKind, ShopError, ShopResult};
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

pub const PAYMENT_SUCCEEDED: &str = "payment_intent.succeeded";
pub const PAYMENT_FAILED: &str = "payment_intent.payment_failed";

/// Events that should be enabled on the Stripe webhook endpoint
pub const REQUIRED_WEBHOOK_EVENTS: &[&str] = &[PAYMENT_SUCCEEDED, PAYMENT_FAILED];

#[derive(Debug, PartialEq, Eq)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

fn parse_signature_header(header: &str) -> ShopResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            continue;
        };
        match key {
            "t" => timestamp = value.parse().ok(),
            "v1" => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| {
        ShopError::Unauthorized("Missing timestamp in webhook signature".to_string())
    })?;

    if signatures.is_empty() {
        return Err(ShopError::Unauthorized(
            "No v1 webhook signature found".to_string(),
        ));
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

fn compute_hmac_sha256(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ShopError::Internal(format!("HMAC key rejected: {}", e)))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(hex::encode(mac.finalize().into_bytes()))
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.bytes()
        .zip(b.bytes())
        .fold(0, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// Check a `Stripe-Signature` header against the raw body.
///
/// Fails with `Unauthorized` when the header is malformed, the timestamp is
/// more than `tolerance_secs` away from `now`, or no `v1` entry matches.
pub fn verify_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now: DateTime<Utc>,
    tolerance_secs: i64,
) -> ShopResult<()> {
    let parsed = parse_signature_header(header)?;

    if (now.timestamp() - parsed.timestamp).abs() > tolerance_secs {
        warn!(timestamp = parsed.timestamp, "Webhook timestamp outside tolerance");
        return Err(ShopError::Unauthorized(
            "Webhook timestamp outside tolerance".to_string(),
        ));
    }

    let expected = compute_hmac_sha256(secret, parsed.timestamp, payload)?;
    let valid = parsed
        .signatures
        .iter()
        .any(|sig| constant_time_compare(sig, &expected));

    if !valid {
        warn!("Webhook signature mismatch");
        return Err(ShopError::Unauthorized(
            "Webhook signature mismatch".to_string(),
        ));
    }

    Ok(())
}

/// Build a `Stripe-Signature` header value for a payload.
///
/// Useful for replaying events locally and in tests.
pub fn sign_payload(secret: &str, timestamp: i64, payload: &[u8]) -> ShopResult<String> {
    let signature = compute_hmac_sha256(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, signature))
}

#[derive(Debug, Deserialize)]
struct StripeWebhookEvent {
    id: String,
    #[serde(rename = "type")]
    event_type: String,
    data: StripeEventData,
}

#[derive(Debug, Deserialize)]
struct StripeEventData {
    object: serde_json::Map<String, serde_json::Value>,
}

/// Parse a verified webhook body into a gateway event.
///
/// For `payment_intent.*` events the affected intent is `data.object.id`.
pub fn parse_event(payload: &[u8], received_at: DateTime<Utc>) -> ShopResult<GatewayEvent> {
    let event: StripeWebhookEvent = serde_json::from_slice(payload)
        .map_err(|e| ShopError::validation(format!("Failed to parse webhook: {}", e)))?;

    debug!(event_id = %event.id, event_type = %event.event_type, "Verified Stripe webhook");

    let kind = match event.event_type.as_str() {
        PAYMENT_SUCCEEDED => GatewayEventKind::PaymentSucceeded,
        PAYMENT_FAILED => GatewayEventKind::PaymentFailed,
        other => GatewayEventKind::Other(other.to_string()),
    };

    let gateway_payment_id = event
        .data
        .object
        .get("id")
        .and_then(|v| v.as_str())
        .map(String::from);

    Ok(GatewayEvent {
        event_id: event.id,
        kind,
        gateway_payment_id,
        received_at,
    })
}
