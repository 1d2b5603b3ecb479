use crate::error::DbResultExt;
use crate::rows::{ProductRow, ProductionRow, PRODUCTION_COLUMNS, PRODUCT_COLUMNS};
use crate::PgStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::{
    CatalogStore, NewProduct, Product, ProductId, ProductPatch, ProductionRecord,
    ProductionStatus, ProductionView, ShopError, ShopResult,
};
use sqlx::PgExecutor;
use std::collections::HashMap;

async fn live_product<'e, E>(exec: E, id: ProductId, lock: &str) -> ShopResult<Product>
where
    E: PgExecutor<'e>,
{
    let sql = format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1 AND deleted_at IS NULL {lock}"
    );
    let row = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(id.get())
        .fetch_optional(exec)
        .await
        .db()?
        .ok_or_else(|| ShopError::not_found("Product"))?;
    Ok(row.into())
}

/// Fetch a live product, locking the row for the rest of the transaction
pub(crate) async fn lock_live_product<'e, E>(exec: E, id: ProductId) -> ShopResult<Product>
where
    E: PgExecutor<'e>,
{
    live_product(exec, id, "FOR UPDATE").await
}

impl PgStore {
    async fn production_views(&self, rows: Vec<ProductionRow>) -> ShopResult<Vec<ProductionView>> {
        let ids: Vec<i64> = rows.iter().map(|r| r.product_id).collect();
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        let mut products: HashMap<ProductId, Product> = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .db()?
            .into_iter()
            .map(Product::from)
            .map(|p| (p.id, p))
            .collect();

        let mut views = Vec::with_capacity(rows.len());
        for row in rows {
            let record = row.into_record()?;
            if let Some(product) = products.remove(&record.product_id) {
                views.push(ProductionView { record, product });
            }
        }
        Ok(views)
    }
}

#[async_trait]
impl CatalogStore for PgStore {
    async fn create_product(&self, new: NewProduct) -> ShopResult<Product> {
        let now = Utc::now();
        let sql = format!(
            "INSERT INTO products \
                (name, description, price, stock_quantity, category, image_url, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7) RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&new.name)
            .bind(&new.description)
            .bind(new.price.minor_units())
            .bind(new.stock_quantity)
            .bind(&new.category)
            .bind(&new.image_url)
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .db()?;
        Ok(row.into())
    }

    async fn find_product(&self, id: ProductId) -> ShopResult<Option<Product>> {
        match live_product(&self.pool, id, "").await {
            Ok(product) => Ok(Some(product)),
            Err(ShopError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn list_products(&self) -> ShopResult<Vec<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE deleted_at IS NULL ORDER BY id");
        let rows = sqlx::query_as::<_, ProductRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .db()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update_product(&self, id: ProductId, patch: &ProductPatch) -> ShopResult<Product> {
        let sql = format!(
            "UPDATE products SET \
                name = COALESCE($2, name), \
                description = COALESCE($3, description), \
                price = COALESCE($4, price), \
                stock_quantity = COALESCE($5, stock_quantity), \
                category = COALESCE($6, category), \
                image_url = COALESCE($7, image_url), \
                updated_at = $8 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {PRODUCT_COLUMNS}"
        );
        let row = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(id.get())
            .bind(patch.name.as_deref())
            .bind(patch.description.as_deref())
            .bind(patch.price.map(|p| p.minor_units()))
            .bind(patch.stock_quantity)
            .bind(patch.category.as_deref())
            .bind(patch.image_url.as_deref())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .db()?
            .ok_or_else(|| ShopError::not_found("Product"))?;
        Ok(row.into())
    }

    async fn delete_product(&self, id: ProductId) -> ShopResult<()> {
        let mut tx = self.pool.begin().await.db()?;
        let now = Utc::now();

        // Cart rows go first so this takes locks in the same order as checkout;
        // a missing product rolls the deletes back.
        sqlx::query("DELETE FROM cart_items WHERE product_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .db()?;
        sqlx::query("DELETE FROM wishlist_items WHERE product_id = $1")
            .bind(id.get())
            .execute(&mut *tx)
            .await
            .db()?;

        let deleted = sqlx::query(
            "UPDATE products SET deleted_at = $2, updated_at = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.get())
        .bind(now)
        .execute(&mut *tx)
        .await
        .db()?;
        if deleted.rows_affected() == 0 {
            return Err(ShopError::not_found("Product"));
        }

        tx.commit().await.db()?;
        Ok(())
    }

    async fn start_production(
        &self,
        product_id: ProductId,
        now: DateTime<Utc>,
    ) -> ShopResult<ProductionRecord> {
        let mut tx = self.pool.begin().await.db()?;
        live_product(&mut *tx, product_id, "FOR SHARE").await?;

        let sql = format!(
            "INSERT INTO production_records (product_id, status, started_at, updated_at) \
             VALUES ($1, $2, $3, $3) RETURNING {PRODUCTION_COLUMNS}"
        );
        let record = sqlx::query_as::<_, ProductionRow>(&sql)
            .bind(product_id.get())
            .bind(ProductionStatus::Pending.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .conflict_on(
                "production_records_live_product_key",
                "Production already started for this product",
            )?
            .into_record()?;

        tx.commit().await.db()?;
        Ok(record)
    }

    async fn update_production_status(
        &self,
        product_id: ProductId,
        status: ProductionStatus,
        now: DateTime<Utc>,
    ) -> ShopResult<ProductionRecord> {
        let mut tx = self.pool.begin().await.db()?;

        let sql = format!(
            "SELECT {PRODUCTION_COLUMNS} FROM production_records \
             WHERE product_id = $1 AND deleted_at IS NULL FOR UPDATE"
        );
        let mut record = sqlx::query_as::<_, ProductionRow>(&sql)
            .bind(product_id.get())
            .fetch_optional(&mut *tx)
            .await
            .db()?
            .ok_or_else(|| ShopError::not_found("Production record"))?
            .into_record()?;

        record.set_status(status, now);

        sqlx::query(
            "UPDATE production_records SET status = $2, completed_at = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(record.id.get())
        .bind(record.status.as_str())
        .bind(record.completed_at)
        .bind(record.updated_at)
        .execute(&mut *tx)
        .await
        .db()?;

        tx.commit().await.db()?;
        Ok(record)
    }

    async fn find_production(&self, product_id: ProductId) -> ShopResult<Option<ProductionView>> {
        let sql = format!(
            "SELECT {PRODUCTION_COLUMNS} FROM production_records WHERE product_id = $1 AND deleted_at IS NULL"
        );
        let rows = sqlx::query_as::<_, ProductionRow>(&sql)
            .bind(product_id.get())
            .fetch_optional(&self.pool)
            .await
            .db()?
            .into_iter()
            .collect();
        Ok(self.production_views(rows).await?.pop())
    }

    async fn list_productions(&self) -> ShopResult<Vec<ProductionView>> {
        let sql = format!("SELECT {PRODUCTION_COLUMNS} FROM production_records WHERE deleted_at IS NULL ORDER BY id");
        let rows = sqlx::query_as::<_, ProductionRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .db()?;
        self.production_views(rows).await
    }
}
