//! Order placement and the order lifecycle.

use crate::credentials::Identity;
use crate::error::{ShopError, ShopResult};
use crate::id::{OrderId, UserId};
use crate::order::{Order, OrderStatus};
use crate::store::SharedStore;
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct OrderService {
    store: SharedStore,
}

impl OrderService {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    /// Check out the caller's cart.
    ///
    /// A blank `shipping_address` falls back to the address on the profile.
    #[instrument(skip(self, shipping_address))]
    pub async fn place(&self, user_id: UserId, shipping_address: Option<&str>) -> ShopResult<Order> {
        let address = match shipping_address.map(str::trim).filter(|a| !a.is_empty()) {
            Some(address) => address.to_string(),
            None => self
                .store
                .find_user(user_id)
                .await?
                .map(|user| user.address.trim().to_string())
                .filter(|a| !a.is_empty())
                .ok_or_else(|| ShopError::validation("Shipping address is required"))?,
        };

        let order = self.store.place_order(user_id, &address).await?;
        info!(
            order_id = %order.id,
            total = order.total_amount.minor_units(),
            items = order.items.len(),
            "order placed"
        );
        Ok(order)
    }

    /// An order the caller owns
    pub async fn get(&self, user_id: UserId, id: OrderId) -> ShopResult<Order> {
        let order = self.find(id).await?;
        if !order.is_owned_by(user_id) {
            warn!(order_id = %id, user_id = %user_id, "order read by non-owner");
            return Err(ShopError::Unauthorized("Order belongs to another user".into()));
        }
        Ok(order)
    }

    /// An order the caller owns, or any order for an admin
    pub async fn get_for(&self, identity: Identity, id: OrderId) -> ShopResult<Order> {
        if identity.is_admin() {
            return self.find(id).await;
        }
        self.get(identity.user_id, id).await
    }

    pub async fn list_mine(&self, user_id: UserId) -> ShopResult<Vec<Order>> {
        self.store.list_orders_for_user(user_id).await
    }

    pub async fn list_all(&self) -> ShopResult<Vec<Order>> {
        self.store.list_all_orders().await
    }

    /// Admin status change; `status` outside the admin allow-list is
    /// `InvalidStatus` and leaves the order untouched
    #[instrument(skip(self))]
    pub async fn update_status(&self, id: OrderId, status: &str) -> ShopResult<Order> {
        let next = OrderStatus::parse_admin(status)?;
        let order = self.store.update_order_status(id, next).await?;
        if next == OrderStatus::Cancelled {
            warn!(order_id = %id, "order cancelled; reserved stock stays deducted");
        }
        info!(order_id = %id, status = %next, "order status updated");
        Ok(order)
    }

    /// Soft delete an order the caller owns; refused while a payment is pending
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: UserId, id: OrderId) -> ShopResult<()> {
        self.get(user_id, id).await?;
        self.store.delete_order(id).await?;
        info!(order_id = %id, "order deleted");
        Ok(())
    }

    async fn find(&self, id: OrderId) -> ShopResult<Order> {
        self.store
            .find_order(id)
            .await?
            .ok_or_else(|| ShopError::not_found("Order"))
    }
}
