use crate::error::DbResultExt;
use crate::rows::{OtpRow, OTP_COLUMNS};
use crate::PgStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::otp::SIGNUP;
use shop_core::{NewOtp, Otp, OtpStore, ShopError, ShopResult, UserId};

#[async_trait]
impl OtpStore for PgStore {
    async fn create_otp(&self, new: NewOtp) -> ShopResult<Otp> {
        let sql = format!(
            "INSERT INTO otps (user_id, code, purpose, expires_at, created_at) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {OTP_COLUMNS}"
        );
        let row = sqlx::query_as::<_, OtpRow>(&sql)
            .bind(new.user_id.get())
            .bind(&new.code)
            .bind(&new.purpose)
            .bind(new.expires_at)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .db()?;
        Ok(row.into())
    }

    async fn consume_otp(
        &self,
        user_id: UserId,
        purpose: &str,
        code: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<Otp> {
        let mut tx = self.pool.begin().await.db()?;

        let sql = format!(
            "SELECT {OTP_COLUMNS} FROM otps \
             WHERE user_id = $1 AND purpose = $2 AND NOT is_used \
             ORDER BY created_at DESC, id DESC LIMIT 1 FOR UPDATE"
        );
        let mut record: Otp = sqlx::query_as::<_, OtpRow>(&sql)
            .bind(user_id.get())
            .bind(purpose)
            .fetch_optional(&mut *tx)
            .await
            .db()?
            .ok_or_else(|| ShopError::not_found("OTP"))?
            .into();

        // Expired or mismatched codes leave the row untouched.
        record.check(code, now)?;

        sqlx::query("UPDATE otps SET is_used = TRUE WHERE id = $1")
            .bind(record.id.get())
            .execute(&mut *tx)
            .await
            .db()?;

        if purpose == SIGNUP {
            let verified = sqlx::query(
                "UPDATE users SET is_verified = TRUE, updated_at = $2 \
                 WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(user_id.get())
            .bind(now)
            .execute(&mut *tx)
            .await
            .db()?;
            if verified.rows_affected() == 0 {
                return Err(ShopError::not_found("User"));
            }
        }

        tx.commit().await.db()?;
        record.is_used = true;
        Ok(record)
    }
}
