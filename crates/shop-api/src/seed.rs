//! # Startup Seeding
//!
//! Writes the accounts and catalog a fresh store needs before anyone can
//! administer it. Every step is skipped when its data is already present,
//! so running it on each boot is safe.

use crate::config::SeedConfig;
use shop_core::credentials::hash_password;
use shop_core::services::auth::validate_password;
use shop_core::user::{is_valid_email, normalize_email};
use shop_core::{Money, NewProduct, NewUser, Role, SharedStore, ShopError, ShopResult};
use tracing::{info, warn};

/// Name, description, price in minor units, stock, category
const DEMO_CATALOG: &[(&str, &str, i64, i32, &str)] = &[
    ("Trail Runner 2", "Lightweight running shoe with a grippy outsole.", 1_299_900, 40, "footwear"),
    ("Studio Headphones", "Closed-back wireless headphones with noise cancelling.", 2_999_900, 25, "audio"),
    ("Pocket Speaker", "Waterproof bluetooth speaker, 12 hour battery.", 499_900, 60, "audio"),
    ("Ultrabook 13", "Compact laptop with a 13 inch display.", 14_999_900, 12, "computers"),
    ("Mechanical Keyboard", "Tenkeyless keyboard with hot-swappable switches.", 899_900, 30, "accessories"),
    ("Ergonomic Mouse", "Wireless mouse with a sculpted grip.", 799_900, 50, "accessories"),
    ("Fitness Watch", "Heart rate, sleep and GPS tracking.", 4_599_900, 20, "wearables"),
    ("Mirrorless Camera", "Full-frame body with in-body stabilisation.", 18_999_900, 6, "cameras"),
];

/// What a seeding run wrote
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SeedReport {
    pub admin_created: bool,
    pub products_created: usize,
}

/// Apply `config` to `store`
pub async fn run(store: &SharedStore, config: &SeedConfig, bcrypt_cost: u32) -> ShopResult<SeedReport> {
    let mut report = SeedReport::default();

    if let Some((email, password)) = &config.admin {
        report.admin_created = seed_admin(store, email, password, bcrypt_cost).await?;
    }
    if config.demo_catalog {
        report.products_created = seed_catalog(store).await?;
    }
    Ok(report)
}

async fn seed_admin(
    store: &SharedStore,
    email: &str,
    password: &str,
    bcrypt_cost: u32,
) -> ShopResult<bool> {
    let email = normalize_email(email);
    if !is_valid_email(&email) {
        return Err(ShopError::Configuration(format!(
            "SEED_ADMIN_EMAIL is not an email address: {}",
            email
        )));
    }
    validate_password(password)
        .map_err(|e| ShopError::Configuration(format!("SEED_ADMIN_PASSWORD: {}", e)))?;

    if let Some(existing) = store.find_user_by_email(&email).await? {
        if !existing.is_admin() {
            warn!(user_id = %existing.id, "seed admin email belongs to a customer; left unchanged");
        }
        return Ok(false);
    }

    let admin = store
        .create_user(NewUser {
            full_name: "Administrator".into(),
            email,
            password_hash: hash_password(password, bcrypt_cost)?,
            address: String::new(),
            role: Role::Admin,
            is_verified: true,
        })
        .await?;
    info!(user_id = %admin.id, "seeded admin account");
    Ok(true)
}

async fn seed_catalog(store: &SharedStore) -> ShopResult<usize> {
    if !store.list_products().await?.is_empty() {
        return Ok(0);
    }
    for &(name, description, price, stock_quantity, category) in DEMO_CATALOG {
        let product = NewProduct {
            name: name.into(),
            description: description.into(),
            price: Money::from_minor(price),
            stock_quantity,
            category: category.into(),
            image_url: String::new(),
        };
        product.validate()?;
        store.create_product(product).await?;
    }
    info!(count = DEMO_CATALOG.len(), "seeded demo catalog");
    Ok(DEMO_CATALOG.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use shop_core::MemoryStore;
    use std::sync::Arc;

    fn admin_only() -> SeedConfig {
        SeedConfig {
            admin: Some(("Root@Example.com ".into(), "hunter22".into())),
            demo_catalog: false,
        }
    }

    #[tokio::test]
    async fn test_admin_is_verified_and_seeded_once() {
        let store: SharedStore = Arc::new(MemoryStore::new());

        let first = run(&store, &admin_only(), 4).await.unwrap();
        assert!(first.admin_created);
        let admin = store
            .find_user_by_email("root@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(admin.is_admin());
        assert!(admin.is_verified);

        let second = run(&store, &admin_only(), 4).await.unwrap();
        assert_eq!(second, SeedReport::default());
        assert_eq!(store.list_users().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_catalog_only_fills_an_empty_store() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let config = SeedConfig {
            admin: None,
            demo_catalog: true,
        };

        let report = run(&store, &config, 4).await.unwrap();
        assert_eq!(report.products_created, DEMO_CATALOG.len());
        assert_eq!(run(&store, &config, 4).await.unwrap().products_created, 0);
        assert_eq!(store.list_products().await.unwrap().len(), DEMO_CATALOG.len());
    }

    #[tokio::test]
    async fn test_weak_admin_password_is_a_configuration_error() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let config = SeedConfig {
            admin: Some(("root@example.com".into(), "123".into())),
            demo_catalog: false,
        };
        assert!(matches!(
            run(&store, &config, 4).await,
            Err(ShopError::Configuration(_))
        ));
    }
}
