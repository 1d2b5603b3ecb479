//! # Store Traits
//!
//! Persistence seams for the storefront. Each trait covers one aggregate;
//! [`Store`] bundles them so the application holds a single
//! `Arc<dyn Store>`.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                      Store (trait)                        │
//! │  UserStore · OtpStore · TokenStore · CatalogStore ·       │
//! │  CartStore · WishlistStore · OrderStore · PaymentStore    │
//! └──────────────────────────────────────────────────────────┘
//!                 ▲                         ▲
//!         ┌───────┴───────┐         ┌───────┴───────┐
//!         │  MemoryStore  │         │    PgStore    │
//!         │  (shop-core)  │         │(shop-postgres)│
//!         └───────────────┘         └───────────────┘
//! ```
//!
//! Methods that touch more than one row are atomic: either every write
//! lands or none does. Soft-deleted rows are invisible to every read.

use crate::cart::{CartItem, CartLine, WishlistItem, WishlistLine};
use crate::credentials::RefreshToken;
use crate::error::ShopResult;
use crate::id::{CartItemId, OrderId, ProductId, UserId};
use crate::order::{Order, OrderStatus};
use crate::otp::{NewOtp, Otp};
use crate::payment::{NewPayment, Payment, PaymentOutcome, Settlement};
use crate::product::{
    NewProduct, Product, ProductPatch, ProductionRecord, ProductionStatus, ProductionView,
};
use crate::user::{NewUser, User, UserPatch};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// `Conflict` when the email is taken
    async fn create_user(&self, new: NewUser) -> ShopResult<User>;

    async fn find_user(&self, id: UserId) -> ShopResult<Option<User>>;

    /// Lookup by normalised email
    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>>;

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> ShopResult<User>;

    async fn set_user_blocked(&self, id: UserId, blocked: bool) -> ShopResult<User>;

    async fn list_users(&self) -> ShopResult<Vec<User>>;
}

#[async_trait]
pub trait OtpStore: Send + Sync {
    async fn create_otp(&self, new: NewOtp) -> ShopResult<Otp>;

    /// Validate `code` against the newest unused passcode for
    /// `(user, purpose)` and mark it used.
    ///
    /// `NotFound` when no unused passcode exists, `OtpExpired` / `OtpMismatch`
    /// from [`Otp::check`]. A `signup` passcode also flips the user's
    /// verified flag in the same unit.
    async fn consume_otp(
        &self,
        user_id: UserId,
        purpose: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<Otp>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn store_refresh_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> ShopResult<RefreshToken>;

    /// A live token with this hash, if any
    async fn find_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<Option<RefreshToken>>;

    /// Swap a live token for a new one. Returns `None` (and writes nothing)
    /// when the presented token is unknown or expired.
    async fn rotate_refresh_token(
        &self,
        token_hash: &str,
        replacement_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ShopResult<Option<RefreshToken>>;

    /// Returns whether a row was removed
    async fn delete_refresh_token(&self, token_hash: &str) -> ShopResult<bool>;
}

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn create_product(&self, new: NewProduct) -> ShopResult<Product>;

    async fn find_product(&self, id: ProductId) -> ShopResult<Option<Product>>;

    async fn list_products(&self) -> ShopResult<Vec<Product>>;

    async fn update_product(&self, id: ProductId, patch: &ProductPatch) -> ShopResult<Product>;

    /// Soft delete; `NotFound` when already gone
    async fn delete_product(&self, id: ProductId) -> ShopResult<()>;

    /// `NotFound` for a missing product, `Conflict` if a live record exists
    async fn start_production(
        &self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> ShopResult<ProductionRecord>;

    async fn update_production_status(
        &self,
        product_id: ProductId,
        status: ProductionStatus,
        now: DateTime<Utc>,
    ) -> ShopResult<ProductionRecord>;

    async fn find_production(&self, product_id: ProductId) -> ShopResult<Option<ProductionView>>;

    async fn list_productions(&self) -> ShopResult<Vec<ProductionView>>;
}

#[async_trait]
pub trait CartStore: Send + Sync {
    /// Create the `(user, product)` line or merge into it, checking the
    /// merged quantity against stock
    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> ShopResult<CartItem>;

    /// `NotFound` for a missing line, `Forbidden` for someone else's
    async fn update_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> ShopResult<CartItem>;

    async fn remove_cart_item(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<()>;

    async fn list_cart(&self, user_id: UserId) -> ShopResult<Vec<CartLine>>;
}

#[async_trait]
pub trait WishlistStore: Send + Sync {
    async fn add_to_wishlist(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> ShopResult<WishlistItem>;

    async fn list_wishlist(&self, user_id: UserId) -> ShopResult<Vec<WishlistLine>>;

    async fn remove_from_wishlist(&self, user_id: UserId, product_id: ProductId) -> ShopResult<()>;
}

#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Turn the user's cart into a `pending` order.
    ///
    /// Stock check, stock decrement, item snapshot and cart clear happen in
    /// one unit; on any error nothing changes.
    async fn place_order(&self, user_id: UserId, shipping_address: &str) -> ShopResult<Order>;

    async fn find_order(&self, id: OrderId) -> ShopResult<Option<Order>>;

    async fn list_orders_for_user(&self, user_id: UserId) -> ShopResult<Vec<Order>>;

    async fn list_all_orders(&self) -> ShopResult<Vec<Order>>;

    /// `InvalidStatus` when the current status cannot move to `next`
    async fn update_order_status(&self, id: OrderId, next: OrderStatus) -> ShopResult<Order>;

    /// Soft delete the order and its items together
    async fn delete_order(&self, id: OrderId) -> ShopResult<()>;
}

#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// `Conflict` when the order already has a pending payment
    async fn create_payment(&self, new: NewPayment) -> ShopResult<Payment>;

    async fn find_payment_by_gateway_id(&self, gateway_payment_id: &str)
        -> ShopResult<Option<Payment>>;

    async fn pending_payment_for_order(&self, order_id: OrderId) -> ShopResult<Option<Payment>>;

    /// Settle a pending payment and move its order.
    ///
    /// Success sets the order `processing` and clears the owner's cart.
    /// Failure sets it `failed` and puts every line's quantity back on
    /// stock. A payment that is no longer pending is `InvalidStatus`.
    async fn settle_payment(
        &self,
        gateway_payment_id: &str,
        outcome: PaymentOutcome,
    ) -> ShopResult<Settlement>;
}

/// Every store capability behind one handle
#[async_trait]
pub trait Store:
    UserStore
    + OtpStore
    + TokenStore
    + CatalogStore
    + CartStore
    + WishlistStore
    + OrderStore
    + PaymentStore
{
    /// Backend name for logs and the health endpoint
    fn backend(&self) -> &'static str;

    /// Cheap liveness check
    async fn ping(&self) -> ShopResult<()> {
        Ok(())
    }
}

/// Type alias for a shared store (dynamic dispatch)
pub type SharedStore = Arc<dyn Store>;
