//! # Order Types
//!
//! Orders, their snapshotted line items, the status state machine, and the
//! checkout planner that turns a locked cart into an order.
//!
//! ```text
//!  pending ──► processing ──► shipped ──► delivered
//!     │             │
//!     ├──► failed   └──► cancelled
//!     └──► cancelled
//! ```

use crate::cart::CartItem;
use crate::error::{ShopError, ShopResult};
use crate::id::{OrderId, OrderItemId, ProductId, UserId};
use crate::money::Money;
use crate::product::Product;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Failed,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Shipped => "shipped",
            OrderStatus::Delivered => "delivered",
            OrderStatus::Failed => "failed",
            OrderStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderStatus::Delivered | OrderStatus::Failed | OrderStatus::Cancelled
        )
    }

    /// Statuses an admin may set by hand. `failed` is reserved for payments.
    pub fn is_admin_settable(&self) -> bool {
        !matches!(self, OrderStatus::Failed)
    }

    fn fulfilment_rank(&self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Failed | OrderStatus::Cancelled => None,
        }
    }

    /// Whether an order in `self` may move to `next`
    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        if self.is_terminal() {
            return false;
        }
        match next {
            OrderStatus::Cancelled => {
                matches!(self, OrderStatus::Pending | OrderStatus::Processing)
            }
            OrderStatus::Failed => *self == OrderStatus::Pending,
            _ => match (self.fulfilment_rank(), next.fulfilment_rank()) {
                (Some(from), Some(to)) => to >= from,
                _ => false,
            },
        }
    }

    /// Parse a status requested through the admin endpoint
    pub fn parse_admin(raw: &str) -> ShopResult<OrderStatus> {
        let status: OrderStatus = raw.parse()?;
        if !status.is_admin_settable() {
            return Err(ShopError::InvalidStatus(raw.to_string()));
        }
        Ok(status)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OrderStatus::Pending),
            "processing" => Ok(OrderStatus::Processing),
            "shipped" => Ok(OrderStatus::Shipped),
            "delivered" => Ok(OrderStatus::Delivered),
            "failed" => Ok(OrderStatus::Failed),
            "cancelled" => Ok(OrderStatus::Cancelled),
            other => Err(ShopError::InvalidStatus(other.to_string())),
        }
    }
}

/// A line on a placed order; price and name are frozen at checkout
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
    pub created_at: DateTime<Utc>,
}

impl OrderItem {
    pub fn line_total(&self) -> ShopResult<Money> {
        self.unit_price.times(self.quantity)
    }
}

/// A placed order with its items
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub shipping_address: String,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub items: Vec<OrderItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Order {
    pub fn is_owned_by(&self, user_id: UserId) -> bool {
        self.user_id == user_id
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|item| item.quantity).sum()
    }
}

/// One line of a checkout plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedLine {
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: Money,
    /// Stock left on the product once this line is taken
    pub remaining_stock: i32,
}

/// Everything a store needs to write when a cart becomes an order.
///
/// Built from cart rows and their products as read under lock. Building the
/// plan performs every check; a store only applies it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutPlan {
    pub lines: Vec<PlannedLine>,
    pub total: Money,
}

impl CheckoutPlan {
    pub fn from_cart<'a, I>(entries: I) -> ShopResult<Self>
    where
        I: IntoIterator<Item = (&'a CartItem, &'a Product)>,
    {
        let mut lines = Vec::new();
        let mut total = Money::ZERO;

        for (item, product) in entries {
            if product.is_deleted() {
                return Err(ShopError::not_found(format!("Product {}", product.id)));
            }
            if !product.has_stock_for(item.quantity) {
                return Err(ShopError::InsufficientStock {
                    product: product.name.clone(),
                });
            }
            total = total.checked_add(product.price.times(item.quantity)?)?;
            lines.push(PlannedLine {
                product_id: product.id,
                product_name: product.name.clone(),
                quantity: item.quantity,
                unit_price: product.price,
                remaining_stock: product.stock_quantity - item.quantity,
            });
        }

        if lines.is_empty() {
            return Err(ShopError::validation("Cart is empty"));
        }

        Ok(Self { lines, total })
    }
}
