//! # Payment Types
//!
//! One payment attempt per order at a time. A payment starts `pending` and
//! settles exactly once, to `succeeded` or `failed`.

use crate::error::ShopError;
use crate::id::{OrderId, PaymentId};
use crate::money::{Currency, Money};
use crate::order::{Order, OrderStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Stored payment status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    Pending,
    Succeeded,
    Failed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Succeeded => "succeeded",
            PaymentStatus::Failed => "failed",
        }
    }
}

impl std::str::FromStr for PaymentStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(PaymentStatus::Pending),
            "succeeded" => Ok(PaymentStatus::Succeeded),
            "failed" => Ok(PaymentStatus::Failed),
            other => Err(ShopError::InvalidStatus(other.to_string())),
        }
    }
}

/// How a pending payment settles
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentOutcome {
    Succeeded,
    Failed,
}

impl PaymentOutcome {
    pub fn as_status(&self) -> PaymentStatus {
        match self {
            PaymentOutcome::Succeeded => PaymentStatus::Succeeded,
            PaymentOutcome::Failed => PaymentStatus::Failed,
        }
    }

    /// What this outcome does to an order currently in `status`.
    ///
    /// The payment itself always records the outcome. A failure releases the
    /// stock reservation unless the goods have already left (shipped or
    /// delivered); a success only advances an order that is still pending.
    pub fn effect_on(&self, status: OrderStatus) -> SettlementEffect {
        let unchanged = SettlementEffect {
            order_status: status,
            restock: false,
            clear_cart: false,
        };
        match (self, status) {
            (PaymentOutcome::Succeeded, OrderStatus::Pending) => SettlementEffect {
                order_status: OrderStatus::Processing,
                restock: false,
                clear_cart: true,
            },
            (PaymentOutcome::Failed, OrderStatus::Pending | OrderStatus::Processing) => {
                SettlementEffect {
                    order_status: OrderStatus::Failed,
                    restock: true,
                    clear_cart: false,
                }
            }
            (PaymentOutcome::Failed, OrderStatus::Cancelled) => SettlementEffect {
                restock: true,
                ..unchanged
            },
            _ => unchanged,
        }
    }
}

/// Order-side changes made when a payment settles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettlementEffect {
    pub order_status: OrderStatus,
    /// Return every order line to stock
    pub restock: bool,
    /// Empty the buyer's cart
    pub clear_cart: bool,
}

impl std::str::FromStr for PaymentOutcome {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "succeeded" => Ok(PaymentOutcome::Succeeded),
            "failed" => Ok(PaymentOutcome::Failed),
            other => Err(ShopError::InvalidStatus(other.to_string())),
        }
    }
}

/// A payment attempt recorded against an order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub order_id: OrderId,
    /// Gateway name, e.g. "stripe"
    pub gateway: String,
    /// Identifier assigned by the gateway (PaymentIntent id for Stripe)
    pub gateway_payment_id: String,
    pub amount: Money,
    pub status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn is_pending(&self) -> bool {
        self.status == PaymentStatus::Pending
    }
}

/// Fields needed to record a new pending payment
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: OrderId,
    pub gateway: String,
    pub gateway_payment_id: String,
    pub amount: Money,
}

/// What the gateway needs to open a payment intent
#[derive(Debug, Clone)]
pub struct IntentRequest {
    pub order_id: OrderId,
    pub amount: Money,
    pub currency: Currency,
    pub metadata: HashMap<String, String>,
    /// Sent to the gateway so a retried request never opens two intents
    pub idempotency_key: String,
}

impl IntentRequest {
    pub fn for_order(order: &Order, currency: Currency) -> Self {
        let mut metadata = HashMap::new();
        metadata.insert("order_id".to_string(), order.id.to_string());
        Self {
            order_id: order.id,
            amount: order.total_amount,
            currency,
            metadata,
            idempotency_key: format!("order-{}-intent", order.id),
        }
    }
}

/// A payment intent opened at the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub gateway_id: String,
    pub client_secret: String,
}

/// A settled payment together with the order it moved
#[derive(Debug, Clone, Serialize)]
pub struct Settlement {
    pub payment: Payment,
    pub order: Order,
}

/// Kinds of asynchronous gateway notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GatewayEventKind {
    PaymentSucceeded,
    PaymentFailed,
    /// Anything the storefront does not act on
    Other(String),
}

impl GatewayEventKind {
    pub fn outcome(&self) -> Option<PaymentOutcome> {
        match self {
            GatewayEventKind::PaymentSucceeded => Some(PaymentOutcome::Succeeded),
            GatewayEventKind::PaymentFailed => Some(PaymentOutcome::Failed),
            GatewayEventKind::Other(_) => None,
        }
    }
}

/// A verified gateway notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayEvent {
    pub event_id: String,
    pub kind: GatewayEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway_payment_id: Option<String>,
    pub received_at: DateTime<Utc>,
}
