//! # Stripe PaymentIntents
//!
//! `PaymentGateway` implementation backed by the PaymentIntents API.
//! The client secret goes back to the frontend, which completes payment
//! with Stripe.js; settlement arrives through the webhook.

use crate::config::StripeConfig;
use crate::webhook;
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde::Deserialize;
use shop_core::{
    GatewayEvent, IntentRequest, PaymentGateway, PaymentIntent, ShopError, ShopResult,
};
use std::time::Duration;
use tracing::{debug, error, info, instrument};

const PROVIDER: &str = "stripe";

/// Stripe PaymentIntents gateway
pub struct StripePaymentGateway {
    config: StripeConfig,
    client: Client,
}

impl StripePaymentGateway {
    /// Create a new Stripe gateway
    pub fn new(config: StripeConfig) -> ShopResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ShopError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Create from environment variables
    pub fn from_env() -> ShopResult<Self> {
        Self::new(StripeConfig::from_env()?)
    }

    pub fn config(&self) -> &StripeConfig {
        &self.config
    }

    fn form_params(request: &IntentRequest) -> Vec<(String, String)> {
        let mut params = vec![
            ("amount".to_string(), request.amount.minor_units().to_string()),
            ("currency".to_string(), request.currency.as_str().to_string()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];

        let mut metadata: Vec<_> = request.metadata.iter().collect();
        metadata.sort();
        for (key, value) in metadata {
            params.push((format!("metadata[{}]", key), value.clone()));
        }

        params
    }
}

#[async_trait]
impl PaymentGateway for StripePaymentGateway {
    #[instrument(skip(self, request), fields(order_id = %request.order_id))]
    async fn create_payment_intent(&self, request: &IntentRequest) -> ShopResult<PaymentIntent> {
        let url = format!("{}/v1/payment_intents", self.config.api_base_url);

        debug!(
            amount = request.amount.minor_units(),
            currency = request.currency.as_str(),
            "Creating Stripe payment intent"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", self.config.auth_header())
            .header("Stripe-Version", &self.config.api_version)
            .header("Idempotency-Key", &request.idempotency_key)
            .form(&Self::form_params(request))
            .send()
            .await
            .map_err(|e| ShopError::upstream(PROVIDER, e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ShopError::upstream(PROVIDER, e.to_string()))?;

        if !status.is_success() {
            error!("Stripe API error: status={}, body={}", status, body);

            if let Ok(error_response) = serde_json::from_str::<StripeErrorResponse>(&body) {
                return Err(ShopError::upstream(PROVIDER, error_response.error.message));
            }

            return Err(ShopError::upstream(
                PROVIDER,
                format!("HTTP {}: {}", status, body),
            ));
        }

        let intent: StripePaymentIntentResponse = serde_json::from_str(&body).map_err(|e| {
            ShopError::upstream(PROVIDER, format!("Failed to parse Stripe response: {}", e))
        })?;

        let client_secret = intent.client_secret.ok_or_else(|| {
            ShopError::upstream(PROVIDER, "Payment intent has no client secret")
        })?;

        info!(intent_id = %intent.id, status = %intent.status, "Created Stripe payment intent");

        Ok(PaymentIntent {
            gateway_id: intent.id,
            client_secret,
        })
    }

    #[instrument(skip(self, payload, signature))]
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent> {
        let now = Utc::now();
        webhook::verify_signature(
            &self.config.webhook_secret,
            payload,
            signature,
            now,
            self.config.webhook_tolerance_secs,
        )?;
        webhook::parse_event(payload, now)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER
    }
}

// =============================================================================
// Stripe API Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct StripePaymentIntentResponse {
    id: String,
    #[serde(default)]
    client_secret: Option<String>,
    #[serde(default)]
    status: String,
}

#[derive(Debug, Deserialize)]
struct StripeErrorResponse {
    error: StripeError,
}

#[derive(Debug, Deserialize)]
struct StripeError {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::{Currency, Money, OrderId};
    use std::collections::HashMap;

    #[test]
    fn test_form_params() {
        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), "7".to_string());
        let request = IntentRequest {
            order_id: OrderId::new(7),
            amount: Money::from_minor(25_000),
            currency: Currency::INR,
            metadata,
            idempotency_key: "order-7-intent".to_string(),
        };

        let params = StripePaymentGateway::form_params(&request);
        assert!(params.contains(&("amount".to_string(), "25000".to_string())));
        assert!(params.contains(&("currency".to_string(), "inr".to_string())));
        assert!(params.contains(&("metadata[order_id]".to_string(), "7".to_string())));
    }

    #[tokio::test]
    async fn test_verify_webhook_uses_configured_secret() {
        let gateway =
            StripePaymentGateway::new(StripeConfig::new("sk_test_abc", "whsec_abc")).unwrap();
        let body = br#"{"id":"evt_9","type":"payment_intent.payment_failed","data":{"object":{"id":"pi_9"}}}"#;
        let header = webhook::sign_payload("whsec_abc", Utc::now().timestamp(), body).unwrap();

        let event = gateway.verify_webhook(body, &header).await.unwrap();
        assert_eq!(event.gateway_payment_id.as_deref(), Some("pi_9"));

        assert!(matches!(
            gateway.verify_webhook(body, "t=1,v1=deadbeef").await,
            Err(ShopError::Unauthorized(_))
        ));
    }

    #[test]
    fn test_provider_name() {
        let gateway =
            StripePaymentGateway::new(StripeConfig::new("sk_test_abc", "whsec_abc")).unwrap();
        assert_eq!(gateway.provider_name(), "stripe");
        assert_eq!(gateway.webhook_path(), "/webhook/stripe");
    }
}
