//! # Cart & Wishlist Types
//!
//! Per-user line items. A cart holds at most one line per product, and the
//! quantity on a line never exceeds the product's stock at the time it was
//! written.

use crate::error::{ShopError, ShopResult};
use crate::id::{CartItemId, ProductId, UserId, WishlistItemId};
use crate::money::Money;
use crate::product::Product;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored cart row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The product fields shown next to a cart or wishlist line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductSnapshot {
    pub name: String,
    pub price: Money,
    pub stock_quantity: i32,
    pub image_url: String,
}

impl From<&Product> for ProductSnapshot {
    fn from(product: &Product) -> Self {
        Self {
            name: product.name.clone(),
            price: product.price,
            stock_quantity: product.stock_quantity,
            image_url: product.image_url.clone(),
        }
    }
}

/// A cart row joined with its live product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartLine {
    pub id: CartItemId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub product: ProductSnapshot,
}

impl CartLine {
    pub fn line_total(&self) -> ShopResult<Money> {
        self.product.price.times(self.quantity)
    }
}

/// A cart listing with its running total
#[derive(Debug, Clone, Serialize)]
pub struct CartView {
    pub items: Vec<CartLine>,
    pub total: Money,
}

impl CartView {
    pub fn new(items: Vec<CartLine>) -> ShopResult<Self> {
        let mut total = Money::ZERO;
        for line in &items {
            total = total.checked_add(line.line_total()?)?;
        }
        Ok(Self { items, total })
    }
}

/// Quantities on a cart line must be at least one
pub fn validate_quantity(quantity: i32) -> ShopResult<()> {
    if quantity < 1 {
        return Err(ShopError::validation("Quantity must be at least 1"));
    }
    Ok(())
}

/// Quantity a line ends up with when `adding` is merged into `existing`,
/// checked against the product's stock
pub fn merge_quantity(product: &Product, existing: i32, adding: i32) -> ShopResult<i32> {
    validate_quantity(adding)?;
    let merged = existing
        .checked_add(adding)
        .ok_or_else(|| ShopError::validation("Quantity overflow"))?;
    ensure_stock(product, merged)?;
    Ok(merged)
}

pub fn ensure_stock(product: &Product, quantity: i32) -> ShopResult<()> {
    if !product.has_stock_for(quantity) {
        return Err(ShopError::InsufficientStock {
            product: product.name.clone(),
        });
    }
    Ok(())
}

/// A stored wishlist row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: WishlistItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}

/// A wishlist row joined with its live product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WishlistLine {
    pub id: WishlistItemId,
    pub product_id: ProductId,
    pub product: ProductSnapshot,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i32) -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(7),
            name: "Tea Tin".into(),
            description: String::new(),
            price: Money::from_minor(100),
            stock_quantity: stock,
            category: String::new(),
            image_url: String::new(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_merge_within_stock() {
        assert_eq!(merge_quantity(&product(5), 2, 3).unwrap(), 5);
    }

    #[test]
    fn test_merge_over_stock_names_product() {
        let err = merge_quantity(&product(5), 3, 3).unwrap_err();
        match err {
            ShopError::InsufficientStock { product } => assert_eq!(product, "Tea Tin"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_zero_quantity_rejected() {
        assert!(matches!(
            merge_quantity(&product(5), 0, 0),
            Err(ShopError::Validation(_))
        ));
    }

    #[test]
    fn test_cart_view_total() {
        let snapshot = ProductSnapshot::from(&product(5));
        let lines = vec![
            CartLine {
                id: CartItemId::new(1),
                product_id: ProductId::new(7),
                quantity: 2,
                product: snapshot.clone(),
            },
            CartLine {
                id: CartItemId::new(2),
                product_id: ProductId::new(8),
                quantity: 1,
                product: ProductSnapshot {
                    price: Money::from_minor(50),
                    ..snapshot
                },
            },
        ];
        assert_eq!(CartView::new(lines).unwrap().total, Money::from_minor(250));
    }
}
