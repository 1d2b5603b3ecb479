//! Payment intents, client confirmation and gateway webhooks.

use crate::credentials::Identity;
use crate::error::{ShopError, ShopResult};
use crate::gateway::GatewaySelector;
use crate::id::{OrderId, UserId};
use crate::money::Currency;
use crate::order::OrderStatus;
use crate::payment::{
    GatewayEvent, IntentRequest, NewPayment, Payment, PaymentOutcome, Settlement,
};
use crate::store::SharedStore;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// A recorded pending payment plus the secret the client completes it with
#[derive(Debug, Clone, Serialize)]
pub struct CreatedIntent {
    pub payment: Payment,
    pub client_secret: String,
}

#[derive(Clone)]
pub struct PaymentService {
    store: SharedStore,
    gateways: GatewaySelector,
    currency: Currency,
}

impl PaymentService {
    pub fn new(store: SharedStore, gateways: GatewaySelector, currency: Currency) -> Self {
        Self {
            store,
            gateways,
            currency,
        }
    }

    pub fn gateways(&self) -> &GatewaySelector {
        &self.gateways
    }

    /// Open a gateway intent for a pending order the caller owns
    #[instrument(skip(self))]
    pub async fn create_intent(&self, user_id: UserId, order_id: OrderId) -> ShopResult<CreatedIntent> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or_else(|| ShopError::not_found("Order"))?;
        if !order.is_owned_by(user_id) {
            return Err(ShopError::Unauthorized("Order belongs to another user".into()));
        }
        if order.status != OrderStatus::Pending {
            return Err(ShopError::InvalidStatus(format!(
                "order is {}, expected pending",
                order.status
            )));
        }
        // Fast path only: the store insert is the authoritative one-pending
        // check, and the per-order idempotency key makes a racing gateway
        // call return the same intent instead of a second one.
        if self.store.pending_payment_for_order(order_id).await?.is_some() {
            return Err(ShopError::Conflict(
                "Pending payment already exists for this order".into(),
            ));
        }

        let gateway = self.gateways.default_gateway()?;
        let intent = gateway
            .create_payment_intent(&IntentRequest::for_order(&order, self.currency))
            .await?;

        let payment = self
            .store
            .create_payment(NewPayment {
                order_id,
                gateway: gateway.provider_name().to_string(),
                gateway_payment_id: intent.gateway_id,
                amount: order.total_amount,
            })
            .await?;

        info!(
            order_id = %order_id,
            payment_id = %payment.gateway_payment_id,
            amount = %payment.amount.display(self.currency),
            "payment intent created"
        );
        Ok(CreatedIntent {
            payment,
            client_secret: intent.client_secret,
        })
    }

    /// Client-driven confirmation: the order owner or an admin reports the
    /// outcome of a payment
    #[instrument(skip(self, identity), fields(user_id = %identity.user_id))]
    pub async fn confirm(
        &self,
        identity: Identity,
        gateway_payment_id: &str,
        status: &str,
    ) -> ShopResult<Settlement> {
        let outcome: PaymentOutcome = status.parse()?;
        let payment = self
            .store
            .find_payment_by_gateway_id(gateway_payment_id)
            .await?
            .ok_or_else(|| ShopError::not_found("Payment"))?;

        if !identity.is_admin() {
            let order = self
                .store
                .find_order(payment.order_id)
                .await?
                .ok_or_else(|| ShopError::not_found("Order"))?;
            if !order.is_owned_by(identity.user_id) {
                return Err(ShopError::Unauthorized("Payment belongs to another user".into()));
            }
        }

        self.settle(gateway_payment_id, outcome).await
    }

    /// Verify and apply a gateway webhook.
    ///
    /// Events the storefront does not act on, unknown payments and
    /// duplicate deliveries are acknowledged without changes.
    #[instrument(skip(self, payload, signature))]
    pub async fn handle_webhook(
        &self,
        provider: &str,
        payload: &[u8],
        signature: &str,
    ) -> ShopResult<Option<Settlement>> {
        let gateway = self
            .gateways
            .get(provider)
            .ok_or_else(|| {
                ShopError::Configuration(format!("Payment provider '{}' is not configured", provider))
            })?;
        let event = gateway.verify_webhook(payload, signature).await?;
        self.apply_event(event).await
    }

    pub async fn apply_event(&self, event: GatewayEvent) -> ShopResult<Option<Settlement>> {
        let (Some(outcome), Some(payment_id)) =
            (event.kind.outcome(), event.gateway_payment_id.as_deref())
        else {
            info!(event_id = %event.event_id, kind = ?event.kind, "gateway event ignored");
            return Ok(None);
        };

        match self.settle(payment_id, outcome).await {
            Ok(settlement) => Ok(Some(settlement)),
            Err(ShopError::NotFound(what)) => {
                warn!(event_id = %event.event_id, payment_id, "{} not found for gateway event", what);
                Ok(None)
            }
            Err(ShopError::InvalidStatus(reason)) => {
                info!(event_id = %event.event_id, payment_id, %reason, "gateway event already applied");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    async fn settle(&self, gateway_payment_id: &str, outcome: PaymentOutcome) -> ShopResult<Settlement> {
        let settlement = self.store.settle_payment(gateway_payment_id, outcome).await?;
        match outcome {
            PaymentOutcome::Succeeded => info!(
                order_id = %settlement.order.id,
                order_status = %settlement.order.status,
                payment_id = gateway_payment_id,
                "payment settled"
            ),
            PaymentOutcome::Failed => warn!(
                order_id = %settlement.order.id,
                order_status = %settlement.order.status,
                payment_id = gateway_payment_id,
                "payment failed"
            ),
        }
        Ok(settlement)
    }
}
