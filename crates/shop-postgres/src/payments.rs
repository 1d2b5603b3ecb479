use crate::error::DbResultExt;
use crate::orders::lock_live_order;
use crate::rows::{PaymentRow, PAYMENT_COLUMNS};
use crate::PgStore;
use async_trait::async_trait;
use chrono::Utc;
use shop_core::{
    NewPayment, OrderId, Payment, PaymentOutcome, PaymentStatus, PaymentStore,
    Settlement, ShopError, ShopResult,
};
use tracing::debug;

#[async_trait]
impl PaymentStore for PgStore {
    async fn create_payment(&self, new: NewPayment) -> ShopResult<Payment> {
        let mut tx = self.pool.begin().await.db()?;
        lock_live_order(&mut tx, new.order_id).await?;

        let now = Utc::now();
        let sql = format!(
            "INSERT INTO payments (order_id, gateway, gateway_payment_id, amount, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $6) RETURNING {PAYMENT_COLUMNS}"
        );
        let payment = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(new.order_id.get())
            .bind(&new.gateway)
            .bind(&new.gateway_payment_id)
            .bind(new.amount.minor_units())
            .bind(PaymentStatus::Pending.as_str())
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .conflict_on(
                "payments_one_pending_per_order",
                "Pending payment already exists for this order",
            )?
            .into_payment()?;

        tx.commit().await.db()?;
        Ok(payment)
    }

    async fn find_payment_by_gateway_id(
        &self,
        gateway_payment_id: &str,
    ) -> ShopResult<Option<Payment>> {
        let sql = format!("SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_payment_id = $1");
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(gateway_payment_id)
            .fetch_optional(&self.pool)
            .await
            .db()?
            .map(PaymentRow::into_payment)
            .transpose()
    }

    async fn pending_payment_for_order(&self, order_id: OrderId) -> ShopResult<Option<Payment>> {
        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE order_id = $1 AND status = 'pending'"
        );
        sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(order_id.get())
            .fetch_optional(&self.pool)
            .await
            .db()?
            .map(PaymentRow::into_payment)
            .transpose()
    }

    async fn settle_payment(
        &self,
        gateway_payment_id: &str,
        outcome: PaymentOutcome,
    ) -> ShopResult<Settlement> {
        let mut tx = self.pool.begin().await.db()?;

        let sql = format!(
            "SELECT {PAYMENT_COLUMNS} FROM payments WHERE gateway_payment_id = $1 FOR UPDATE"
        );
        let mut payment = sqlx::query_as::<_, PaymentRow>(&sql)
            .bind(gateway_payment_id)
            .fetch_optional(&mut *tx)
            .await
            .db()?
            .ok_or_else(|| ShopError::not_found("Payment"))?
            .into_payment()?;
        if !payment.is_pending() {
            return Err(ShopError::InvalidStatus("Payment already processed".into()));
        }

        let mut order = lock_live_order(&mut tx, payment.order_id).await?;
        let effect = outcome.effect_on(order.status);

        let now = Utc::now();
        if effect.clear_cart {
            sqlx::query("DELETE FROM cart_items WHERE user_id = $1")
                .bind(order.user_id.get())
                .execute(&mut *tx)
                .await
                .db()?;
        }
        if effect.restock {
            let mut restock: Vec<_> = order
                .items
                .iter()
                .map(|item| (item.product_id.get(), item.quantity))
                .collect();
            restock.sort_unstable();
            for (product_id, quantity) in restock {
                sqlx::query(
                    "UPDATE products SET stock_quantity = stock_quantity + $2, updated_at = $3 WHERE id = $1",
                )
                .bind(product_id)
                .bind(quantity)
                .bind(now)
                .execute(&mut *tx)
                .await
                .db()?;
            }
            debug!(order_id = %order.id, "Order items returned to stock");
        }
        order.status = effect.order_status;

        sqlx::query("UPDATE orders SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(order.id.get())
            .bind(order.status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .db()?;

        payment.status = outcome.as_status();
        payment.updated_at = now;
        sqlx::query("UPDATE payments SET status = $2, updated_at = $3 WHERE id = $1")
            .bind(payment.id.get())
            .bind(payment.status.as_str())
            .bind(now)
            .execute(&mut *tx)
            .await
            .db()?;

        tx.commit().await.db()?;
        order.updated_at = now;
        Ok(Settlement { payment, order })
    }
}
