use crate::error::DbResultExt;
use crate::rows::{UserRow, USER_COLUMNS};
use crate::PgStore;
use async_trait::async_trait;
use chrono::Utc;
use shop_core::{NewUser, ShopError, ShopResult, User, UserId, UserPatch, UserStore};

#[async_trait]
impl UserStore for PgStore {
    async fn create_user(&self, new: NewUser) -> ShopResult<User> {
        let sql = format!(
            "INSERT INTO users (full_name, email, password_hash, role, address, is_verified) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(&new.full_name)
            .bind(&new.email)
            .bind(&new.password_hash)
            .bind(new.role.as_str())
            .bind(&new.address)
            .bind(new.is_verified)
            .fetch_one(&self.pool)
            .await
            .conflict_on("users_email_key", "Email already registered")?
            .into_user()
    }

    async fn find_user(&self, id: UserId) -> ShopResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.get())
            .fetch_optional(&self.pool)
            .await
            .db()?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn find_user_by_email(&self, email: &str) -> ShopResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1 AND deleted_at IS NULL");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .db()?
            .map(UserRow::into_user)
            .transpose()
    }

    async fn update_user(&self, id: UserId, patch: &UserPatch) -> ShopResult<User> {
        let sql = format!(
            "UPDATE users SET \
                full_name = COALESCE($2, full_name), \
                password_hash = COALESCE($3, password_hash), \
                role = COALESCE($4, role), \
                address = COALESCE($5, address), \
                avatar_url = COALESCE($6, avatar_url), \
                updated_at = $7 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.get())
            .bind(patch.full_name.as_deref())
            .bind(patch.password_hash.as_deref())
            .bind(patch.role.map(|r| r.as_str()))
            .bind(patch.address.as_deref())
            .bind(patch.avatar_url.as_deref())
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .db()?
            .ok_or_else(|| ShopError::not_found("User"))?
            .into_user()
    }

    async fn set_user_blocked(&self, id: UserId, blocked: bool) -> ShopResult<User> {
        let sql = format!(
            "UPDATE users SET is_blocked = $2, updated_at = $3 \
             WHERE id = $1 AND deleted_at IS NULL RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id.get())
            .bind(blocked)
            .bind(Utc::now())
            .fetch_optional(&self.pool)
            .await
            .db()?
            .ok_or_else(|| ShopError::not_found("User"))?
            .into_user()
    }

    async fn list_users(&self) -> ShopResult<Vec<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE deleted_at IS NULL ORDER BY id");
        sqlx::query_as::<_, UserRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .db()?
            .into_iter()
            .map(UserRow::into_user)
            .collect()
    }
}
