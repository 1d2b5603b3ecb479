use crate::error::DbResultExt;
use crate::rows::{
    CartRow, OrderItemRow, OrderRow, ProductRow, CART_COLUMNS, ORDER_COLUMNS, ORDER_ITEM_COLUMNS,
    PRODUCT_COLUMNS,
};
use crate::PgStore;
use async_trait::async_trait;
use chrono::Utc;
use shop_core::{
    CartItem, CheckoutPlan, Order, OrderId, OrderItem, OrderStatus, OrderStore, Product,
    ProductId, ShopError, ShopResult, UserId,
};
use sqlx::{PgConnection, PgExecutor};
use std::collections::HashMap;
use tracing::info;

/// Attach live items to a batch of order rows
pub(crate) async fn with_items<'e, E>(exec: E, rows: Vec<OrderRow>) -> ShopResult<Vec<Order>>
where
    E: PgExecutor<'e>,
{
    let ids: Vec<i64> = rows.iter().map(|r| r.id).collect();
    let sql = format!(
        "SELECT {ORDER_ITEM_COLUMNS} FROM order_items \
         WHERE order_id = ANY($1) AND deleted_at IS NULL ORDER BY id"
    );
    let mut items: HashMap<i64, Vec<OrderItem>> = HashMap::new();
    for row in sqlx::query_as::<_, OrderItemRow>(&sql)
        .bind(&ids)
        .fetch_all(exec)
        .await
        .db()?
    {
        items.entry(row.order_id).or_default().push(row.into());
    }

    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_order(lines)
        })
        .collect()
}

/// Lock a live order row
pub(crate) async fn lock_live_order(conn: &mut PgConnection, id: OrderId) -> ShopResult<Order> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL FOR UPDATE"
    );
    let row = sqlx::query_as::<_, OrderRow>(&sql)
        .bind(id.get())
        .fetch_optional(&mut *conn)
        .await
        .db()?
        .ok_or_else(|| ShopError::not_found("Order"))?;
    with_items(conn, vec![row])
        .await?
        .pop()
        .ok_or_else(|| ShopError::not_found("Order"))
}

#[async_trait]
impl OrderStore for PgStore {
    async fn place_order(&self, user_id: UserId, shipping_address: &str) -> ShopResult<Order> {
        let mut tx = self.pool.begin().await.db()?;

        let sql = format!("SELECT {CART_COLUMNS} FROM cart_items WHERE user_id = $1 ORDER BY id FOR UPDATE");
        let lines: Vec<CartItem> = sqlx::query_as::<_, CartRow>(&sql)
            .bind(user_id.get())
            .fetch_all(&mut *tx)
            .await
            .db()?
            .into_iter()
            .map(Into::into)
            .collect();

        // Lock in id order so concurrent checkouts cannot deadlock.
        let mut product_ids: Vec<i64> = lines.iter().map(|l| l.product_id.get()).collect();
        product_ids.sort_unstable();
        product_ids.dedup();
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1) ORDER BY id FOR UPDATE"
        );
        let products: HashMap<ProductId, Product> = sqlx::query_as::<_, ProductRow>(&sql)
            .bind(&product_ids)
            .fetch_all(&mut *tx)
            .await
            .db()?
            .into_iter()
            .map(Product::from)
            .map(|p| (p.id, p))
            .collect();

        let mut entries = Vec::with_capacity(lines.len());
        for line in &lines {
            let product = products
                .get(&line.product_id)
                .ok_or_else(|| ShopError::not_found("Product"))?;
            entries.push((line, product));
        }
        let plan = CheckoutPlan::from_cart(entries)?;

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO orders (user_id, shipping_address, total_amount, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $5) RETURNING {ORDER_COLUMNS}"
        );
        let order_row = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.get())
            .bind(shipping_address)
            .bind(plan.total.minor_units())
            .bind(OrderStatus::Pending.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .db()?;

        let item_sql = format!(
            "INSERT INTO order_items (order_id, product_id, product_name, quantity, unit_price, created_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {ORDER_ITEM_COLUMNS}"
        );
        let mut items = Vec::with_capacity(plan.lines.len());
        for line in &plan.lines {
            let decremented = sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = $3 \
                 WHERE id = $1 AND stock_quantity >= $2",
            )
            .bind(line.product_id.get())
            .bind(line.quantity)
            .bind(now)
            .execute(&mut *tx)
            .await
            .db()?;
            if decremented.rows_affected() == 0 {
                return Err(ShopError::InsufficientStock {
                    product: line.product_name.clone(),
                });
            }

            let item = sqlx::query_as::<_, OrderItemRow>(&item_sql)
                .bind(order_row.id)
                .bind(line.product_id.get())
                .bind(&line.product_name)
                .bind(line.quantity)
                .bind(line.unit_price.minor_units())
                .bind(now)
                .fetch_one(&mut *tx)
                .await
                .db()?;
            items.push(OrderItem::from(item));
        }

        // Only the lines this checkout locked; a line added meanwhile stays.
        let line_ids: Vec<i64> = lines.iter().map(|l| l.id.get()).collect();
        sqlx::query("DELETE FROM cart_items WHERE id = ANY($1)")
            .bind(&line_ids)
            .execute(&mut *tx)
            .await
            .db()?;

        tx.commit().await.db()?;

        let order = order_row.into_order(items)?;
        info!(order_id = %order.id, user_id = %user_id, "Order rows committed");
        Ok(order)
    }

    async fn find_order(&self, id: OrderId) -> ShopResult<Option<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1 AND deleted_at IS NULL");
        let rows: Vec<OrderRow> = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .db()?
            .into_iter()
            .collect();
        Ok(with_items(&self.pool, rows).await?.pop())
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> ShopResult<Vec<Order>> {
        let sql = format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 AND deleted_at IS NULL ORDER BY id DESC"
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(user_id.get())
            .fetch_all(&self.pool)
            .await
            .db()?;
        with_items(&self.pool, rows).await
    }

    async fn list_all_orders(&self) -> ShopResult<Vec<Order>> {
        let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE deleted_at IS NULL ORDER BY id DESC");
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .db()?;
        with_items(&self.pool, rows).await
    }

    async fn update_order_status(&self, id: OrderId, next: OrderStatus) -> ShopResult<Order> {
        let mut tx = self.pool.begin().await.db()?;
        let mut order = lock_live_order(&mut tx, id).await?;

        if !order.status.can_transition_to(next) {
            return Err(ShopError::InvalidStatus(format!(
                "cannot move order from {} to {}",
                order.status, next
            )));
        }

        let now = Utc::now();
        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(id.get())
            .bind(next.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .db()?;

        tx.commit().await.db()?;
        order.status = next;
        order.updated_at = now;
        Ok(order)
    }

    async fn delete_order(&self, id: OrderId) -> ShopResult<()> {
        let mut tx = self.pool.begin().await.db()?;
        lock_live_order(&mut tx, id).await?;

        // create_payment takes the same order lock, so no intent can slip in
        let paying: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM payments WHERE order_id = $1 AND status = 'pending')",
        )
        .bind(id.get())
        .fetch_one(&mut *tx)
        .await
        .db()?;
        if paying {
            return Err(ShopError::InvalidStatus(
                "Order has a payment in progress".into(),
            ));
        }

        let now = Utc::now();
        sqlx::query("UPDATE orders SET deleted_at = $2 WHERE id = $1")
            .bind(id.get())
            .bind(now)
            .execute(&mut *tx)
            .await
            .db()?;

        sqlx::query("UPDATE order_items SET deleted_at = $2 WHERE order_id = $1 AND deleted_at IS NULL")
            .bind(id.get())
            .bind(now)
            .execute(&mut *tx)
            .await
            .db()?;

        tx.commit().await.db()?;
        Ok(())
    }
}
