use crate::catalog::lock_live_product;
use crate::error::DbResultExt;
use crate::rows::{CartLineRow, CartRow, CART_COLUMNS};
use crate::PgStore;
use async_trait::async_trait;
use chrono::Utc;
use shop_core::cart::{ensure_stock, merge_quantity, validate_quantity};
use shop_core::{CartItem, CartItemId, CartLine, CartStore, ProductId, ShopError, ShopResult, UserId};
use sqlx::PgConnection;

/// Lock a cart line and check it belongs to `user_id`
async fn owned_line(conn: &mut PgConnection, user_id: UserId, item_id: CartItemId) -> ShopResult<CartItem> {
    let sql = format!("SELECT {CART_COLUMNS} FROM cart_items WHERE id = $1 FOR UPDATE");
    let line: CartItem = sqlx::query_as::<_, CartRow>(&sql)
        .bind(item_id.get())
        .fetch_optional(conn)
        .await
        .db()?
        .ok_or_else(|| ShopError::not_found("Cart item"))?
        .into();
    if line.user_id != user_id {
        return Err(ShopError::Forbidden("Cart item belongs to another user".into()));
    }
    Ok(line)
}

#[async_trait]
impl CartStore for PgStore {
    async fn add_to_cart(
        &self,
        user_id: UserId,
        product_id: ProductId,
        quantity: i32,
    ) -> ShopResult<CartItem> {
        let mut tx = self.pool.begin().await.db()?;

        // Cart line before product, the same order place_order locks them in.
        let sql = format!(
            "SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 AND product_id = $2 FOR UPDATE"
        );
        let existing = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id.get())
            .bind(product_id.get())
            .fetch_optional(&mut *tx)
            .await
            .db()?
            .map(CartItem::from);
        let product = lock_live_product(&mut *tx, product_id).await?;
        let now = Utc::now();

        let row = match existing {
            Some(line) => {
                let merged = merge_quantity(&product, line.quantity, quantity)?;
                let sql = format!(
                    "UPDATE cart_items SET quantity = $2, updated_at = $3 WHERE id = $1 RETURNING {CART_COLUMNS}"
                );
                sqlx::query_as::<_, CartRow>(&sql)
                    .bind(line.id.get())
                    .bind(merged)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await
                    .db()?
            }
            None => {
                let quantity = merge_quantity(&product, 0, quantity)?;
                let sql = format!(
                    "INSERT INTO cart_items (user_id, product_id, quantity, created_at, updated_at) \
                     VALUES ($1, $2, $3, $4, $4) RETURNING {CART_COLUMNS}"
                );
                sqlx::query_as::<_, CartRow>(&sql)
                    .bind(user_id.get())
                    .bind(product_id.get())
                    .bind(quantity)
                    .bind(now)
                    .fetch_one(&mut *tx)
                    .await
                    .conflict_on(
                        "cart_items_user_id_product_id_key",
                        "Cart line was added concurrently; retry",
                    )?
            }
        };

        tx.commit().await.db()?;
        Ok(row.into())
    }

    async fn update_cart_item(
        &self,
        user_id: UserId,
        item_id: CartItemId,
        quantity: i32,
    ) -> ShopResult<CartItem> {
        validate_quantity(quantity)?;
        let mut tx = self.pool.begin().await.db()?;

        let line = owned_line(&mut tx, user_id, item_id).await?;
        let product = lock_live_product(&mut *tx, line.product_id).await?;
        ensure_stock(&product, quantity)?;

        let sql = format!(
            "UPDATE cart_items SET quantity = $2, updated_at = $3 WHERE id = $1 RETURNING {CART_COLUMNS}"
        );
        let row = sqlx::query_as::<_, CartRow>(&sql)
            .bind(item_id.get())
            .bind(quantity)
            .bind(Utc::now())
            .fetch_one(&mut *tx)
            .await
            .db()?;

        tx.commit().await.db()?;
        Ok(row.into())
    }

    async fn remove_cart_item(&self, user_id: UserId, item_id: CartItemId) -> ShopResult<()> {
        let mut tx = self.pool.begin().await.db()?;
        owned_line(&mut tx, user_id, item_id).await?;

        sqlx::query("DELETE FROM cart_items WHERE id = $1")
            .bind(item_id.get())
            .execute(&mut *tx)
            .await
            .db()?;

        tx.commit().await.db()?;
        Ok(())
    }

    async fn list_cart(&self, user_id: UserId) -> ShopResult<Vec<CartLine>> {
        let rows = sqlx::query_as::<_, CartLineRow>(
            "SELECT c.id, c.product_id, c.quantity, p.name, p.price, p.stock_quantity, p.image_url \
             FROM cart_items c JOIN products p ON p.id = c.product_id \
             WHERE c.user_id = $1 AND p.deleted_at IS NULL \
             ORDER BY c.id",
        )
        .bind(user_id.get())
        .fetch_all(&self.pool)
        .await
        .db()?;
        Ok(rows.into_iter().map(Into::into).collect())
    }
}
