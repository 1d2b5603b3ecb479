//! # Product Types
//!
//! Catalog entries, their partial updates, and the production tracker
//! records admins attach to a product.

use crate::error::{ShopError, ShopResult};
use crate::id::{ProductId, ProductionId};
use crate::money::Money;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A product in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    /// Unit price in minor units
    pub price: Money,
    pub stock_quantity: i32,
    pub category: String,
    pub image_url: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Product {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    pub fn has_stock_for(&self, quantity: i32) -> bool {
        self.stock_quantity >= quantity
    }
}

/// Admin payload for creating a product
#[derive(Debug, Clone, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: Money,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub image_url: String,
}

impl NewProduct {
    pub fn validate(&self) -> ShopResult<()> {
        if self.name.trim().is_empty() {
            return Err(ShopError::validation("Product name is required"));
        }
        if self.price.is_negative() {
            return Err(ShopError::validation("Price cannot be negative"));
        }
        if self.stock_quantity < 0 {
            return Err(ShopError::validation("Stock quantity cannot be negative"));
        }
        Ok(())
    }
}

/// Partial update: only present fields are written
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Money>,
    pub stock_quantity: Option<i32>,
    pub category: Option<String>,
    pub image_url: Option<String>,
}

impl ProductPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.stock_quantity.is_none()
            && self.category.is_none()
            && self.image_url.is_none()
    }

    pub fn validate(&self) -> ShopResult<()> {
        if self.is_empty() {
            return Err(ShopError::validation("No valid fields to update"));
        }
        if matches!(&self.name, Some(name) if name.trim().is_empty()) {
            return Err(ShopError::validation("Product name cannot be empty"));
        }
        if matches!(self.price, Some(price) if price.is_negative()) {
            return Err(ShopError::validation("Price cannot be negative"));
        }
        if matches!(self.stock_quantity, Some(stock) if stock < 0) {
            return Err(ShopError::validation("Stock quantity cannot be negative"));
        }
        Ok(())
    }

    pub fn apply(&self, product: &mut Product) {
        if let Some(name) = &self.name {
            product.name = name.clone();
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(stock) = self.stock_quantity {
            product.stock_quantity = stock;
        }
        if let Some(category) = &self.category {
            product.category = category.clone();
        }
        if let Some(image_url) = &self.image_url {
            product.image_url = image_url.clone();
        }
    }
}

/// Production tracker status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductionStatus {
    Pending,
    InProgress,
    Completed,
}

impl ProductionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProductionStatus::Pending => "pending",
            ProductionStatus::InProgress => "in_progress",
            ProductionStatus::Completed => "completed",
        }
    }
}

impl std::str::FromStr for ProductionStatus {
    type Err = ShopError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ProductionStatus::Pending),
            "in_progress" => Ok(ProductionStatus::InProgress),
            "completed" => Ok(ProductionStatus::Completed),
            other => Err(ShopError::InvalidStatus(other.to_string())),
        }
    }
}

/// A production run for a product
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: ProductionId,
    pub product_id: ProductId,
    pub status: ProductionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip)]
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ProductionRecord {
    /// Move to `status`, stamping `completed_at` on completion
    pub fn set_status(&mut self, status: ProductionStatus, now: DateTime<Utc>) {
        self.status = status;
        self.completed_at = match status {
            ProductionStatus::Completed => Some(now),
            _ => None,
        };
        self.updated_at = now;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// A production record with its product resolved
#[derive(Debug, Clone, Serialize)]
pub struct ProductionView {
    #[serde(flatten)]
    pub record: ProductionRecord,
    pub product: Product,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mug() -> Product {
        let now = Utc::now();
        Product {
            id: ProductId::new(1),
            name: "Mug".into(),
            description: "Stoneware".into(),
            price: Money::from_minor(45000),
            stock_quantity: 10,
            category: "kitchen".into(),
            image_url: "mug.png".into(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[test]
    fn test_patch_only_touches_present_fields() {
        let mut product = mug();
        let patch: ProductPatch = serde_json::from_str(r#"{"price": 39900}"#).unwrap();
        patch.validate().unwrap();
        patch.apply(&mut product);

        assert_eq!(product.price, Money::from_minor(39900));
        assert_eq!(product.name, "Mug");
        assert_eq!(product.stock_quantity, 10);
    }

    #[test]
    fn test_patch_rejects_negative_stock() {
        let patch = ProductPatch {
            stock_quantity: Some(-1),
            ..Default::default()
        };
        assert!(matches!(patch.validate(), Err(ShopError::Validation(_))));
        assert!(ProductPatch::default().validate().is_err());
    }

    #[test]
    fn test_new_product_validation() {
        let new: NewProduct =
            serde_json::from_str(r#"{"name": "Lamp", "price": 120000, "stock_quantity": 3}"#)
                .unwrap();
        assert!(new.validate().is_ok());

        let bad = NewProduct {
            name: " ".into(),
            ..new
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn test_production_completion_stamps_time() {
        let now = Utc::now();
        let mut record = ProductionRecord {
            id: ProductionId::new(1),
            product_id: ProductId::new(1),
            status: ProductionStatus::Pending,
            started_at: now,
            completed_at: None,
            updated_at: now,
            deleted_at: None,
        };
        record.set_status(ProductionStatus::Completed, now);
        assert_eq!(record.completed_at, Some(now));
        assert!("shipped".parse::<ProductionStatus>().is_err());
    }
}
