//! # In-Memory Store
//!
//! A [`Store`] kept in process memory. Every method takes one lock over all
//! tables, so multi-row operations are trivially atomic and two checkouts
//! can never interleave. Used by the test suites and when the server runs
//! without `DATABASE_URL`.

use crate::cart::{
    ensure_stock, merge_quantity, validate_quantity, CartItem, CartLine, ProductSnapshot,
    WishlistItem, WishlistLine,
};
use crate::credentials::RefreshToken;
use crate::error::{ShopError, ShopResult};
use crate::id::{
    CartItemId, OrderId, OrderItemId, OtpId, PaymentId, ProductId, ProductionId, RefreshTokenId,
    UserId, WishlistItemId,
};
use crate::order::{CheckoutPlan, Order, OrderItem, OrderStatus};
use crate::otp::{self, NewOtp, Otp};
use crate::payment::{NewPayment, Payment, PaymentOutcome, PaymentStatus, Settlement};
use crate::product::{
    NewProduct, Product, ProductPatch, ProductionRecord, ProductionStatus, ProductionView,
};
use crate::store::{
    CartStore, CatalogStore, OrderStore, OtpStore, PaymentStore, Store, TokenStore, UserStore,
    WishlistStore,
};
use crate::user::{NewUser, User, UserPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Default)]
struct Tables {
    sequence: i64,
    users: BTreeMap<UserId, User>,
    otps: Vec<Otp>,
    refresh_tokens: Vec<RefreshToken>,
    products: BTreeMap<ProductId, Product>,
    productions: BTreeMap<ProductionId, ProductionRecord>,
    cart: BTreeMap<CartItemId, CartItem>,
    wishlist: BTreeMap<WishlistItemId, WishlistItem>,
    orders: BTreeMap<OrderId, Order>,
    payments: BTreeMap<PaymentId, Payment>,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.sequence += 1;
        self.sequence
    }

    fn live_product(&self, id: ProductId) -> ShopResult<&Product> {
        self.products
            .get(&id)
            .filter(|p| !p.is_deleted())
            .ok_or_else(|| ShopError::not_found("Product"))
    }

    fn live_order(&self, id: OrderId) -> ShopResult<&Order> {
        self.orders
            .get(&id)
            .filter(|o| !o.is_deleted())
            .ok_or_else(|| ShopError::not_found("Order"))
    }

    fn user_mut(&mut self, id: UserId) -> ShopResult<&mut User> {
        self.users
            .get_mut(&id)
            .filter(|u| !u.is_deleted())
            .ok_or_else(|| ShopError::not_found("User"))
    }

    fn live_productions(&self) -> impl Iterator<Item = &ProductionRecord> {
        self.productions.values().filter(|r| !r.is_deleted())
    }

    fn production_view(&self, record: &ProductionRecord) -> Option<ProductionView> {
        self.products
            .get(&record.product_id)
            .map(|product| ProductionView {
                record: record.clone(),
                product: product.clone(),
            })
    }
}

/// Process-local store with the same semantics as the PostgreSQL one
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn create_user(&self, new: NewUser) -> ShopResult<User> {
        let mut t = self.tables.lock().await;
        if t.users.values().any(|u| u.email == new.email) {
            return Err(ShopError::Conflict("Email already registered".into()));
        }
        let now = Utc::now();
        let user = User {
            id: UserId::new(t.next_id()),
            full_name: new.full_name,
            email: new.email,
            password_hash: new.password_hash,
            role: new.role,
            is_verified: new.is_verified,
            is_blocked: false,
            avatar_url: None,
            address: new.address,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        t.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: UserId) -> ShopResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.get(&id).filter(|u| !u.is_deleted()).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>> {
        let t = self.tables.lock().await;
        Ok(t.users
            .values()
            .find(|u| u.email == email && !u.is_deleted())
            .cloned())
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> ShopResult<User> {
        let mut t = self.tables.lock().await;
        let user = t.user_mut(id)?;
        patch.apply(user);
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn set_user_blocked(&self, id: UserId, blocked: bool) -> ShopResult<User> {
        let mut t = self.tables.lock().await;
        let user = t.user_mut(id)?;
        user.is_blocked = blocked;
        user.updated_at = Utc::now();
        Ok(user.clone())
    }

    async fn list_users(&self) -> ShopResult<Vec<User>> {
        let t = self.tables.lock().await;
        Ok(t.users.values().filter(|u| !u.is_deleted()).cloned().collect())
    }
}

#[async_trait]
impl OtpStore for MemoryStore {
    async fn create_otp(&self, new: NewOtp) -> ShopResult<Otp> {
        let mut t = self.tables.lock().await;
        let record = Otp {
            id: OtpId::new(t.next_id()),
            user_id: new.user_id,
            code: new.code,
            purpose: new.purpose,
            expires_at: new.expires_at,
            is_used: false,
            created_at: Utc::now(),
        };
        t.otps.push(record.clone());
        Ok(record)
    }

    async fn consume_otp(
        &self,
        user_id: UserId,
        purpose: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<Otp> {
        let mut t = self.tables.lock().await;
        let index = t
            .otps
            .iter()
            .enumerate()
            .filter(|(_, o)| o.user_id == user_id && o.purpose == purpose && !o.is_used)
            .max_by_key(|(_, o)| (o.created_at, o.id))
            .map(|(i, _)| i)
            .ok_or_else(|| ShopError::not_found("OTP"))?;

        t.otps[index].check(code, now)?;

        if purpose == otp::SIGNUP {
            let user = t.user_mut(user_id)?;
            user.is_verified = true;
            user.updated_at = now;
        }
        t.otps[index].is_used = true;
        Ok(t.otps[index].clone())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn store_refresh_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> ShopResult<RefreshToken> {
        let mut t = self.tables.lock().await;
        let token = RefreshToken {
            id: RefreshTokenId::new(t.next_id()),
            user_id,
            token_hash: token_hash.to_string(),
            expires_at,
            created_at: Utc::now(),
        };
        t.refresh_tokens.push(token.clone());
        Ok(token)
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<Option<RefreshToken>> {
        let t = self.tables.lock().await;
        Ok(t.refresh_tokens
            .iter()
            .find(|rt| rt.token_hash == token_hash && rt.is_live(now))
            .cloned())
    }

    async fn rotate_refresh_token(
        &self,
        token_hash: &str,
        replacement_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ShopResult<Option<RefreshToken>> {
        let mut t = self.tables.lock().await;
        let Some(index) = t
            .refresh_tokens
            .iter()
            .position(|rt| rt.token_hash == token_hash && rt.is_live(now))
        else {
            return Ok(None);
        };
        let old = t.refresh_tokens.remove(index);
        let token = RefreshToken {
            id: RefreshTokenId::new(t.next_id()),
            user_id: old.user_id,
            token_hash: replacement_hash.to_string(),
            expires_at,
            created_at: now,
        };
        t.refresh_tokens.push(token.clone());
        Ok(Some(token))
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> ShopResult<bool> {
        let mut t = self.tables.lock().await;
        let before = t.refresh_tokens.len();
        t.refresh_tokens.retain(|rt| rt.token_hash != token_hash);
        Ok(t.refresh_tokens.len() < before)
    }
}

#[async_trait]
impl CatalogStore for MemoryStore {
    async fn create_product(&self, new: NewProduct) -> ShopResult<Product> {
        let mut t = self.tables.lock().await;
        let now = Utc::now();
        let product = Product {
            id: ProductId::new(t.next_id()),
            name: new.name,
            description: new.description,
            price: new.price,
            stock_quantity: new.stock_quantity,
            category: new.category,
            image_url: new.image_url,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        t.products.insert(product.id, product.clone());
        Ok(product)
    }

    async fn find_product(&self, id: ProductId) -> ShopResult<Option<Product>> {
        let t = self.tables.lock().await;
        Ok(t.live_product(id).ok().cloned())
    }

    async fn list_products(&self) -> ShopResult<Vec<Product>> {
        let t = self.tables.lock().await;
        Ok(t.products
            .values()
            .filter(|p| !p.is_deleted())
            .cloned()
            .collect())
    }

    async fn update_product(&self, id: ProductId, patch: &ProductPatch) -> ShopResult<Product> {
        let mut t = self.tables.lock().await;
        t.live_product(id)?;
        let product = t
            .products
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Product"))?;
        patch.apply(product);
        product.updated_at = Utc::now();
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> ShopResult<()> {
        let mut t = self.tables.lock().await;
        t.live_product(id)?;
        let now = Utc::now();
        if let Some(product) = t.products.get_mut(&id) {
            product.deleted_at = Some(now);
            product.updated_at = now;
        }
        t.cart.retain(|_, line| line.product_id != id);
        t.wishlist.retain(|_, line| line.product_id != id);
        Ok(())
    }

    async fn start_production(
        &self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> ShopResult<ProductionRecord> {
        let mut t = self.tables.lock().await;
        t.live_product(product_id)?;
        if t.live_productions().any(|r| r.product_id == product_id) {
            return Err(ShopError::Conflict(
                "Production already started for this product".into(),
            ));
        }
        let record = ProductionRecord {
            id: ProductionId::new(t.next_id()),
            product_id,
            status: ProductionStatus::Pending,
            started_at: now,
            completed_at: None,
            updated_at: now,
            deleted_at: None,
        };
        t.productions.insert(record.id, record.clone());
        Ok(record)
    }

    async fn update_production_status(
        &self,
        product_id: ProductId,
        status: ProductionStatus,
        now: DateTime<Utc>,
    ) -> ShopResult<ProductionRecord> {
        let mut t = self.tables.lock().await;
        let record = t
            .productions
            .values_mut()
            .find(|r| r.product_id == product_id && !r.is_deleted())
            .ok_or_else(|| ShopError::not_found("Production record"))?;
        record.set_status(status, now);
        Ok(record.clone())
    }

    async fn find_production(&self, product_id: ProductId) -> ShopResult<Option<ProductionView>> {
        let t = self.tables.lock().await;
        let view = t
            .live_productions()
            .find(|r| r.product_id == product_id)
            .and_then(|r| t.production_view(r));
        Ok(view)
    }

    async fn list_productions(&self) -> ShopResult<Vec<ProductionView>> {
        let t = self.tables.lock().await;
        Ok(t.live_productions()
            .filter_map(|r| t.production_view(r))
            .collect())
    }
}

#[async_trait]
impl CartStore for MemoryStore {
    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> ShopResult<CartItem> {
        let mut t = self.tables.lock().await;
        let product = t.live_product(product_id)?.clone();
        let existing = t
            .cart
            .values()
            .find(|line| line.user_id == user_id && line.product_id == product_id)
            .map(|line| line.id);
        let now = Utc::now();

        match existing {
            Some(id) => {
                let line = t
                    .cart
                    .get_mut(&id)
                    .ok_or_else(|| ShopError::not_found("Cart item"))?;
                line.quantity = merge_quantity(&product, line.quantity, quantity)?;
                line.updated_at = now;
                Ok(line.clone())
            }
            None => {
                let quantity = merge_quantity(&product, 0, quantity)?;
                let line = CartItem {
                    id: CartItemId::new(t.next_id()),
                    user_id,
                    product_id,
                    quantity,
                    created_at: now,
                    updated_at: now,
                };
                t.cart.insert(line.id, line.clone());
                Ok(line)
            }
        }
    }

    async fn update_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> ShopResult<CartItem> {
        validate_quantity(quantity)?;
        let mut t = self.tables.lock().await;
        let line = t
            .cart
            .get(&item_id)
            .ok_or_else(|| ShopError::not_found("Cart item"))?;
        if line.user_id != user_id {
            return Err(ShopError::Forbidden("Cart item belongs to another user".into()));
        }
        ensure_stock(t.live_product(line.product_id)?, quantity)?;

        let line = t
            .cart
            .get_mut(&item_id)
            .ok_or_else(|| ShopError::not_found("Cart item"))?;
        line.quantity = quantity;
        line.updated_at = Utc::now();
        Ok(line.clone())
    }

    async fn remove_cart_item(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<()> {
        let mut t = self.tables.lock().await;
        let line = t
            .cart
            .get(&item_id)
            .ok_or_else(|| ShopError::not_found("Cart item"))?;
        if line.user_id != user_id {
            return Err(ShopError::Forbidden("Cart item belongs to another user".into()));
        }
        t.cart.remove(&item_id);
        Ok(())
    }

    async fn list_cart(&self, user_id: UserId) -> ShopResult<Vec<CartLine>> {
        let t = self.tables.lock().await;
        Ok(t.cart
            .values()
            .filter(|line| line.user_id == user_id)
            .filter_map(|line| {
                t.live_product(line.product_id).ok().map(|product| CartLine {
                    id: line.id,
                    product_id: line.product_id,
                    quantity: line.quantity,
                    product: ProductSnapshot::from(product),
                })
            })
            .collect())
    }
}

#[async_trait]
impl WishlistStore for MemoryStore {
    async fn add_to_wishlist(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> ShopResult<WishlistItem> {
        let mut t = self.tables.lock().await;
        t.live_product(product_id)?;
        if t
            .wishlist
            .values()
            .any(|w| w.user_id == user_id && w.product_id == product_id)
        {
            return Err(ShopError::Conflict("Product already in wishlist".into()));
        }
        let item = WishlistItem {
            id: WishlistItemId::new(t.next_id()),
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        t.wishlist.insert(item.id, item.clone());
        Ok(item)
    }

    async fn list_wishlist(&self, user_id: UserId) -> ShopResult<Vec<WishlistLine>> {
        let t = self.tables.lock().await;
        Ok(t.wishlist
            .values()
            .filter(|w| w.user_id == user_id)
            .filter_map(|w| {
                t.live_product(w.product_id).ok().map(|product| WishlistLine {
                    id: w.id,
                    product_id: w.product_id,
                    product: ProductSnapshot::from(product),
                    created_at: w.created_at,
                })
            })
            .collect())
    }

    async fn remove_from_wishlist(&self, user_id: UserId, product_id: ProductId) -> ShopResult<()> {
        let mut t = self.tables.lock().await;
        let id = t
            .wishlist
            .values()
            .find(|w| w.user_id == user_id && w.product_id == product_id)
            .map(|w| w.id)
            .ok_or_else(|| ShopError::not_found("Wishlist item"))?;
        t.wishlist.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn place_order(&self, user_id: UserId, shipping_address: &str) -> ShopResult<Order> {
        let mut t = self.tables.lock().await;

        let mut entries = Vec::new();
        for line in t.cart.values().filter(|line| line.user_id == user_id) {
            let product = t
                .products
                .get(&line.product_id)
                .ok_or_else(|| ShopError::not_found("Product"))?;
            entries.push((line.clone(), product.clone()));
        }
        let plan = CheckoutPlan::from_cart(entries.iter().map(|(line, product)| (line, product)))?;

        let now = Utc::now();
        let order_id = OrderId::new(t.next_id());
        let mut items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            if let Some(product) = t.products.get_mut(&line.product_id) {
                product.stock_quantity = line.remaining_stock;
                product.updated_at = now;
            }
            items.push(OrderItem {
                id: OrderItemId::new(t.next_id()),
                order_id,
                product_id: line.product_id,
                product_name: line.product_name.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                created_at: now,
            });
        }

        let order = Order {
            id: order_id,
            user_id,
            shipping_address: shipping_address.to_string(),
            total_amount: plan.total,
            status: OrderStatus::Pending,
            items,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        t.orders.insert(order_id, order.clone());
        t.cart.retain(|_, line| line.user_id != user_id);
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> ShopResult<Option<Order>> {
        let t = self.tables.lock().await;
        Ok(t.live_order(id).ok().cloned())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> ShopResult<Vec<Order>> {
        let t = self.tables.lock().await;
        Ok(t.orders
            .values()
            .rev()
            .filter(|o| o.user_id == user_id && !o.is_deleted())
            .cloned()
            .collect())
    }

    async fn list_all_orders(&self) -> ShopResult<Vec<Order>> {
        let t = self.tables.lock().await;
        Ok(t.orders
            .values()
            .rev()
            .filter(|o| !o.is_deleted())
            .cloned()
            .collect())
    }

    async fn update_order_status(&self, id: OrderId, next: OrderStatus) -> ShopResult<Order> {
        let mut t = self.tables.lock().await;
        let current = t.live_order(id)?.status;
        if !current.can_transition_to(next) {
            return Err(ShopError::InvalidStatus(format!(
                "cannot move order from {} to {}",
                current, next
            )));
        }
        let order = t
            .orders
            .get_mut(&id)
            .ok_or_else(|| ShopError::not_found("Order"))?;
        order.status = next;
        order.updated_at = Utc::now();
        Ok(order.clone())
    }

    async fn delete_order(&self, id: OrderId) -> ShopResult<()> {
        let mut t = self.tables.lock().await;
        t.live_order(id)?;
        if t.payments.values().any(|p| p.order_id == id && p.is_pending()) {
            return Err(ShopError::InvalidStatus(
                "Order has a payment in progress".into(),
            ));
        }
        if let Some(order) = t.orders.get_mut(&id) {
            order.deleted_at = Some(Utc::now());
        }
        Ok(())
    }
}

#[async_trait]
impl PaymentStore for MemoryStore {
    async fn create_payment(&self, new: NewPayment) -> ShopResult<Payment> {
        let mut t = self.tables.lock().await;
        t.live_order(new.order_id)?;
        if t
            .payments
            .values()
            .any(|p| p.order_id == new.order_id && p.is_pending())
        {
            return Err(ShopError::Conflict(
                "Pending payment already exists for this order".into(),
            ));
        }
        let now = Utc::now();
        let payment = Payment {
            id: PaymentId::new(t.next_id()),
            order_id: new.order_id,
            gateway: new.gateway,
            gateway_payment_id: new.gateway_payment_id,
            amount: new.amount,
            status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        };
        t.payments.insert(payment.id, payment.clone());
        Ok(payment)
    }

    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> ShopResult<Option<Payment>> {
        let t = self.tables.lock().await;
        Ok(t.payments
            .values()
            .find(|p| p.gateway_payment_id == gateway_payment_id)
            .cloned())
    }

    async fn pending_payment_for_order(&self, order_id: OrderId) -> ShopResult<Option<Payment>> {
        let t = self.tables.lock().await;
        Ok(t.payments
            .values()
            .find(|p| p.order_id == order_id && p.is_pending())
            .cloned())
    }

    async fn settle_payment(
        &self,
        gateway_payment_id: &str,
        outcome: PaymentOutcome,
    ) -> ShopResult<Settlement> {
        let mut t = self.tables.lock().await;
        let mut payment = t
            .payments
            .values()
            .find(|p| p.gateway_payment_id == gateway_payment_id)
            .cloned()
            .ok_or_else(|| ShopError::not_found("Payment"))?;
        if !payment.is_pending() {
            return Err(ShopError::InvalidStatus("Payment already processed".into()));
        }
        let mut order = t.live_order(payment.order_id)?.clone();
        let effect = outcome.effect_on(order.status);

        let now = Utc::now();
        if effect.clear_cart {
            t.cart.retain(|_, line| line.user_id != order.user_id);
        }
        if effect.restock {
            for item in &order.items {
                if let Some(product) = t.products.get_mut(&item.product_id) {
                    product.stock_quantity += item.quantity;
                    product.updated_at = now;
                }
            }
        }
        order.status = effect.order_status;
        order.updated_at = now;
        payment.status = outcome.as_status();
        payment.updated_at = now;

        t.orders.insert(order.id, order.clone());
        t.payments.insert(payment.id, payment.clone());
        Ok(Settlement { payment, order })
    }
}

#[async_trait]
impl Store for MemoryStore {
    fn backend(&self) -> &'static str {
        "memory"
    }
}
