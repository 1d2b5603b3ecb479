use crate::error::DbResultExt;
use crate::rows::{TokenRow, TOKEN_COLUMNS};
use crate::PgStore;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use shop_core::{RefreshToken, ShopResult, TokenStore, UserId};

#[async_trait]
impl TokenStore for PgStore {
    async fn store_refresh_token(
        &self,
        user_id: UserId,
        token_hash: &str,
        expires_at: DateTime<Utc>,
    ) -> ShopResult<RefreshToken> {
        let sql = format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {TOKEN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(user_id.get())
            .bind(token_hash)
            .bind(expires_at)
            .bind(Utc::now())
            .fetch_one(&self.pool)
            .await
            .db()?;
        Ok(row.into())
    }

    async fn find_refresh_token(
        &self,
        token_hash: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<Option<RefreshToken>> {
        let sql = format!(
            "SELECT {TOKEN_COLUMNS} FROM refresh_tokens WHERE token_hash = $1 AND expires_at > $2"
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(token_hash)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .db()?;
        Ok(row.map(Into::into))
    }

    async fn rotate_refresh_token(
        &self,
        token_hash: &str,
        replacement_hash: &str,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ShopResult<Option<RefreshToken>> {
        let mut tx = self.pool.begin().await.db()?;

        let owner: Option<i64> = sqlx::query_scalar(
            "DELETE FROM refresh_tokens WHERE token_hash = $1 AND expires_at > $2 RETURNING user_id",
        )
        .bind(token_hash)
        .bind(now)
        .fetch_optional(&mut *tx)
        .await
        .db()?;

        let Some(user_id) = owner else {
            return Ok(None);
        };

        let sql = format!(
            "INSERT INTO refresh_tokens (user_id, token_hash, expires_at, created_at) \
             VALUES ($1, $2, $3, $4) RETURNING {TOKEN_COLUMNS}"
        );
        let row = sqlx::query_as::<_, TokenRow>(&sql)
            .bind(user_id)
            .bind(replacement_hash)
            .bind(expires_at)
            .bind(now)
            .fetch_one(&mut *tx)
            .await
            .db()?;

        tx.commit().await.db()?;
        Ok(Some(row.into()))
    }

    async fn delete_refresh_token(&self, token_hash: &str) -> ShopResult<bool> {
        let result = sqlx::query("DELETE FROM refresh_tokens WHERE token_hash = $1")
            .bind(token_hash)
            .execute(&self.pool)
            .await
            .db()?;
        Ok(result.rows_affected() > 0)
    }
}
