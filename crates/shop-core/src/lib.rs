//! # shop-core
//!
//! Core types, traits and workflows for the storefront backend.
//!
//! This crate provides:
//! - `ShopError` for typed error handling
//! - Domain types: `User`, `Product`, `CartItem`, `Order`, `Payment`, `Otp`
//! - `Store` and its per-aggregate traits, with the in-process `MemoryStore`
//! - `Mailer` and `PaymentGateway` seams for the outside world
//! - Credential utilities: bcrypt hashing, HS256 access tokens, refresh tokens
//! - Services that implement the signup, cart, checkout and payment workflows
//!
//! ## Example
//!
//! ```rust,ignore
//! use shop_core::{MemoryStore, OrderService, CartService};
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let cart = CartService::new(store.clone());
//! let orders = OrderService::new(store);
//!
//! cart.add(user_id, product_id, 2).await?;
//! let order = orders.place(user_id, Some("12 MG Road")).await?;
//! assert_eq!(order.status, OrderStatus::Pending);
//! ```

pub mod cart;
pub mod credentials;
pub mod error;
pub mod gateway;
pub mod id;
pub mod mailer;
pub mod memory;
pub mod money;
pub mod order;
pub mod otp;
pub mod payment;
pub mod product;
pub mod services;
pub mod store;
pub mod user;

// Re-exports for convenience
pub use cart::{CartItem, CartLine, CartView, ProductSnapshot, WishlistItem, WishlistLine};
pub use credentials::{Claims, Identity, RefreshToken, TokenIssuer};
pub use error::{ShopError, ShopResult};
pub use gateway::{BoxedPaymentGateway, GatewaySelector, PaymentGateway};
pub use id::{
    CartItemId, OrderId, OrderItemId, OtpId, PaymentId, ProductId, ProductionId, RefreshTokenId,
    UserId, WishlistItemId,
};
pub use mailer::{Email, Mailer, OutboxMailer, SharedMailer};
pub use memory::MemoryStore;
pub use money::{Currency, Money};
pub use otp::{NewOtp, Otp};
pub use order::{CheckoutPlan, Order, OrderItem, OrderStatus, PlannedLine};
pub use payment::{
    GatewayEvent, GatewayEventKind, IntentRequest, NewPayment, Payment, PaymentIntent,
    PaymentOutcome, PaymentStatus, Settlement, SettlementEffect,
};
pub use product::{
    NewProduct, Product, ProductPatch, ProductionRecord, ProductionStatus, ProductionView,
};
pub use services::{
    AdminUserUpdate, AuthService, AuthSettings, CartService, CatalogService, CreatedIntent,
    OrderService, OtpService, PaymentService, ProfileUpdate, SessionTokens, SignupRequest,
    UserService, WishlistService,
};
pub use store::{
    CartStore, CatalogStore, OrderStore, OtpStore, PaymentStore, SharedStore, Store, TokenStore,
    UserStore, WishlistStore,
};
pub use user::{NewUser, Role, User, UserPatch};
