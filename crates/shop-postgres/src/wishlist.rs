use crate::error::DbResultExt;
use crate::rows::{WishlistLineRow, WishlistRow};
use crate::PgStore;
use async_trait::async_trait;
use chrono::Utc;
use shop_core::{
    CatalogStore, ProductId, ShopError, ShopResult, UserId, WishlistItem, WishlistLine,
    WishlistStore,
};

#[async_trait]
impl WishlistStore for PgStore {
    async fn add_to_wishlist(
        &self,
        user_id: UserId,
        product_id: ProductId,
    ) -> ShopResult<WishlistItem> {
        if self.find_product(product_id).await?.is_none() {
            return Err(ShopError::not_found("Product"));
        }

        let row = sqlx::query_as::<_, WishlistRow>(
            "INSERT INTO wishlist_items (user_id, product_id, created_at) VALUES ($1, $2, $3) \
             RETURNING id, user_id, product_id, created_at",
        )
        .bind(user_id.get())
        .bind(product_id.get())
        .bind(Utc::now())
        .fetch_one(&self.pool)
        .await
        .conflict_on("wishlist_items_user_id_product_id_key", "Product already in wishlist")?;
        Ok(row.into())
    }

    async fn list_wishlist(&self, user_id: UserId) -> ShopResult<Vec<WishlistLine>> {
        let rows = sqlx::query_as::<_, WishlistLineRow>(
            "SELECT w.id, w.product_id, w.created_at, p.name, p.price, p.stock_quantity, p.image_url \
             FROM wishlist_items w JOIN products p ON p.id = w.product_id \
             WHERE w.user_id = $1 AND p.deleted_at IS NULL \
             ORDER BY w.id",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .db()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn remove_from_wishlist(&self, user_id: UserId, product_id: ProductId) -> ShopResult<()> {
        let result = sqlx::query("DELETE FROM wishlist_items WHERE user_id = $1 AND product_id = $2")
            .bind(user_id.get())
            .bind(product_id.get())
            .execute(&self.pool)
            .await
            .db()?;
        if result.rows_affected() == 0 {
            return Err(ShopError::not_found("Wishlist item"));
        }
        Ok(())
    }
}
