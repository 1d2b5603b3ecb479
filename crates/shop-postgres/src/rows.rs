//! Row types as they come out of PostgreSQL, and their domain conversions.

use crate::error::parse_column;
use chrono::{DateTime, Utc};
use shop_core::{
    CartItem, CartLine, Money, Order, OrderItem, Otp, Payment, Product, ProductSnapshot,
    ProductionRecord, RefreshToken, ShopResult, User, WishlistItem, WishlistLine,
};
use sqlx::FromRow;

pub(crate) const USER_COLUMNS: &str = "id, full_name, email, password_hash, role, is_verified, \
     is_blocked, avatar_url, address, created_at, updated_at, deleted_at";

pub(crate) const OTP_COLUMNS: &str = "id, user_id, code, purpose, expires_at, is_used, created_at";

pub(crate) const TOKEN_COLUMNS: &str = "id, user_id, token_hash, expires_at, created_at";

pub(crate) const PRODUCT_COLUMNS: &str = "id, name, description, price, stock_quantity, category, \
     image_url, created_at, updated_at, deleted_at";

pub(crate) const PRODUCTION_COLUMNS: &str =
    "id, product_id, status, started_at, completed_at, updated_at, deleted_at";

pub(crate) const CART_COLUMNS: &str = "id, user_id, product_id, quantity, created_at, updated_at";

pub(crate) const ORDER_COLUMNS: &str =
    "id, user_id, shipping_address, total_amount, status, created_at, updated_at, deleted_at";

pub(crate) const ORDER_ITEM_COLUMNS: &str =
    "id, order_id, product_id, product_name, quantity, unit_price, created_at";

pub(crate) const PAYMENT_COLUMNS: &str =
    "id, order_id, gateway, gateway_payment_id, amount, status, created_at, updated_at";

#[derive(Debug, FromRow)]
pub(crate) struct UserRow {
    id: i64,
    full_name: String,
    email: String,
    password_hash: String,
    role: String,
    is_verified: bool,
    is_blocked: bool,
    avatar_url: Option<String>,
    address: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl UserRow {
    pub(crate) fn into_user(self) -> ShopResult<User> {
        Ok(User {
            id: self.id.into(),
            full_name: self.full_name,
            email: self.email,
            password_hash: self.password_hash,
            role: parse_column(&self.role, "users.role")?,
            is_verified: self.is_verified,
            is_blocked: self.is_blocked,
            avatar_url: self.avatar_url,
            address: self.address,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OtpRow {
    id: i64,
    user_id: i64,
    code: String,
    purpose: String,
    expires_at: DateTime<Utc>,
    is_used: bool,
    created_at: DateTime<Utc>,
}

impl From<OtpRow> for Otp {
    fn from(row: OtpRow) -> Self {
        Otp {
            id: row.id.into(),
            user_id: row.user_id.into(),
            code: row.code,
            purpose: row.purpose,
            expires_at: row.expires_at,
            is_used: row.is_used,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct TokenRow {
    id: i64,
    user_id: i64,
    token_hash: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<TokenRow> for RefreshToken {
    fn from(row: TokenRow) -> Self {
        RefreshToken {
            id: row.id.into(),
            user_id: row.user_id.into(),
            token_hash: row.token_hash,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductRow {
    id: i64,
    name: String,
    description: String,
    price: i64,
    stock_quantity: i32,
    category: String,
    image_url: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id.into(),
            name: row.name,
            description: row.description,
            price: Money::from_minor(row.price),
            stock_quantity: row.stock_quantity,
            category: row.category,
            image_url: row.image_url,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct ProductionRow {
    id: i64,
    pub(crate) product_id: i64,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl ProductionRow {
    pub(crate) fn into_record(self) -> ShopResult<ProductionRecord> {
        Ok(ProductionRecord {
            id: self.id.into(),
            product_id: self.product_id.into(),
            status: parse_column(&self.status, "production_records.status")?,
            started_at: self.started_at,
            completed_at: self.completed_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct CartRow {
    id: i64,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CartRow> for CartItem {
    fn from(row: CartRow) -> Self {
        CartItem {
            id: row.id.into(),
            user_id: row.user_id.into(),
            product_id: row.product_id.into(),
            quantity: row.quantity,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Cart line joined with its product
#[derive(Debug, FromRow)]
pub(crate) struct CartLineRow {
    id: i64,
    product_id: i64,
    quantity: i32,
    name: String,
    price: i64,
    stock_quantity: i32,
    image_url: String,
}

impl From<CartLineRow> for CartLine {
    fn from(row: CartLineRow) -> Self {
        CartLine {
            id: row.id.into(),
            product_id: row.product_id.into(),
            quantity: row.quantity,
            product: ProductSnapshot {
                name: row.name,
                price: Money::from_minor(row.price),
                stock_quantity: row.stock_quantity,
                image_url: row.image_url,
            },
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct WishlistRow {
    id: i64,
    user_id: i64,
    product_id: i64,
    created_at: DateTime<Utc>,
}

impl From<WishlistRow> for WishlistItem {
    fn from(row: WishlistRow) -> Self {
        WishlistItem {
            id: row.id.into(),
            user_id: row.user_id.into(),
            product_id: row.product_id.into(),
            created_at: row.created_at,
        }
    }
}

/// Wishlist entry joined with its product
#[derive(Debug, FromRow)]
pub(crate) struct WishlistLineRow {
    id: i64,
    product_id: i64,
    created_at: DateTime<Utc>,
    name: String,
    price: i64,
    stock_quantity: i32,
    image_url: String,
}

impl From<WishlistLineRow> for WishlistLine {
    fn from(row: WishlistLineRow) -> Self {
        WishlistLine {
            id: row.id.into(),
            product_id: row.product_id.into(),
            product: ProductSnapshot {
                name: row.name,
                price: Money::from_minor(row.price),
                stock_quantity: row.stock_quantity,
                image_url: row.image_url,
            },
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderRow {
    pub(crate) id: i64,
    user_id: i64,
    shipping_address: String,
    total_amount: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl OrderRow {
    pub(crate) fn into_order(self, items: Vec<OrderItem>) -> ShopResult<Order> {
        Ok(Order {
            id: self.id.into(),
            user_id: self.user_id.into(),
            shipping_address: self.shipping_address,
            total_amount: Money::from_minor(self.total_amount),
            status: parse_column(&self.status, "orders.status")?,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
            deleted_at: self.deleted_at,
        })
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct OrderItemRow {
    id: i64,
    pub(crate) order_id: i64,
    product_id: i64,
    product_name: String,
    quantity: i32,
    unit_price: i64,
    created_at: DateTime<Utc>,
}

impl From<OrderItemRow> for OrderItem {
    fn from(row: OrderItemRow) -> Self {
        OrderItem {
            id: row.id.into(),
            order_id: row.order_id.into(),
            product_id: row.product_id.into(),
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: Money::from_minor(row.unit_price),
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
pub(crate) struct PaymentRow {
    id: i64,
    order_id: i64,
    gateway: String,
    gateway_payment_id: String,
    amount: i64,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PaymentRow {
    pub(crate) fn into_payment(self) -> ShopResult<Payment> {
        Ok(Payment {
            id: self.id.into(),
            order_id: self.order_id.into(),
            gateway: self.gateway,
            gateway_payment_id: self.gateway_payment_id,
            amount: Money::from_minor(self.amount),
            status: parse_column(&self.status, "payments.status")?,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
