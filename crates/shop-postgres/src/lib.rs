//! # shop-postgres
//!
//! PostgreSQL implementation of the storefront `Store`.
//!
//! Multi-row operations run in one transaction. Checkout and settlement
//! lock the affected product rows with `SELECT ... FOR UPDATE` in id order,
//! and stock decrements are guarded (`stock_quantity >= $n`) so the
//! `stock_quantity >= 0` check constraint is never the first line of
//! defence.
//!
//! Row locks are always taken in the order payment, order, cart line,
//! product. Every transaction that touches more than one of them follows it.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use shop_postgres::PgStore;
//!
//! let store = PgStore::connect(&database_url, 10).await?;
//! store.migrate().await?;
//! let store: SharedStore = Arc::new(store);
//! ```

mod cart;
mod catalog;
mod error;
mod orders;
mod otp;
mod payments;
mod rows;
mod tokens;
mod users;
mod wishlist;

use async_trait::async_trait;
use error::DbResultExt;
use shop_core::{ShopError, ShopResult, Store};
use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

/// Store backed by a PostgreSQL connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Open a pool against `database_url`
    pub async fn connect(database_url: &str, max_connections: u32) -> ShopResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| ShopError::Configuration(format!("Failed to connect to database: {}", e)))?;

        info!(max_connections, "Connected to PostgreSQL");
        Ok(Self { pool })
    }

    /// Wrap an existing pool
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations
    pub async fn migrate(&self) -> ShopResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ShopError::Storage(format!("Migration failed: {}", e)))?;
        info!("Database migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

impl std::fmt::Debug for PgStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgStore")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

#[async_trait]
impl Store for PgStore {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn ping(&self) -> ShopResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await.db()?;
        Ok(())
    }
}
