//! # Payment Gateway Trait
//!
//! Strategy seam for payment providers. Stripe is the one shipped
//! implementation; the selector lets the server route webhooks by provider
//! name and fall back to a default for new intents.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    PaymentGateway (trait)                   │
//! │  ├── create_payment_intent()                                │
//! │  ├── verify_webhook()                                       │
//! │  └── provider_name()                                        │
//! └─────────────────────────────────────────────────────────────┘
//!                            ▲
//!                    ┌───────┴───────┐
//!                    │ StripePayment │
//!                    │    Gateway    │
//!                    └───────────────┘
//! ```

use crate::error::{ShopError, ShopResult};
use crate::payment::{GatewayEvent, IntentRequest, PaymentIntent};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;

/// Core trait for payment provider implementations.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Open a payment intent for an order total.
    ///
    /// # Returns
    /// The gateway's intent id and the client secret the frontend uses to
    /// complete payment.
    async fn create_payment_intent(&self, request: &IntentRequest) -> ShopResult<PaymentIntent>;

    /// Verify a webhook signature and parse the event.
    ///
    /// # Arguments
    /// * `payload` - Raw webhook body bytes
    /// * `signature` - Signature header from the request
    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent>;

    /// Provider name, stored on every payment row
    fn provider_name(&self) -> &'static str;

    /// Webhook endpoint path for this provider.
    /// Default: `/webhook/{provider_name}`
    fn webhook_path(&self) -> String {
        format!("/webhook/{}", self.provider_name())
    }
}

/// Type alias for a boxed payment gateway (dynamic dispatch)
pub type BoxedPaymentGateway = Arc<dyn PaymentGateway>;

/// Gateway registry with a default provider
#[derive(Clone)]
pub struct GatewaySelector {
    gateways: HashMap<String, BoxedPaymentGateway>,
    default_provider: String,
}

impl GatewaySelector {
    pub fn new(default_provider: impl Into<String>) -> Self {
        Self {
            gateways: HashMap::new(),
            default_provider: default_provider.into(),
        }
    }

    pub fn register(&mut self, gateway: BoxedPaymentGateway) {
        let name = gateway.provider_name().to_string();
        self.gateways.insert(name, gateway);
    }

    /// Register with builder pattern
    pub fn with_gateway(mut self, gateway: BoxedPaymentGateway) -> Self {
        self.register(gateway);
        self
    }

    pub fn get(&self, provider: &str) -> Option<&BoxedPaymentGateway> {
        self.gateways.get(provider)
    }

    /// The default gateway, or a configuration error when none is registered
    pub fn default_gateway(&self) -> ShopResult<&BoxedPaymentGateway> {
        self.gateways.get(&self.default_provider).ok_or_else(|| {
            ShopError::Configuration(format!(
                "Payment provider '{}' is not configured",
                self.default_provider
            ))
        })
    }

    pub fn providers(&self) -> Vec<&str> {
        self.gateways.keys().map(|s| s.as_str()).collect()
    }
}

impl Default for GatewaySelector {
    fn default() -> Self {
        Self::new("stripe")
    }
}

impl std::fmt::Debug for GatewaySelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySelector")
            .field("providers", &self.providers())
            .field("default_provider", &self.default_provider)
            .finish()
    }
}
