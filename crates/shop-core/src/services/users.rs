//! Profile self-service and admin user management.

use crate::credentials::hash_password;
use crate::error::{ShopError, ShopResult};
use crate::id::UserId;
use crate::services::auth::validate_password;
use crate::store::SharedStore;
use crate::user::{Role, User, UserPatch};
use serde::Deserialize;
use tracing::{info, instrument};

/// Fields a user may change on their own profile. Blank strings count as
/// absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub avatar_url: Option<String>,
    pub address: Option<String>,
}

/// Fields an admin may change on any account
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdminUserUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub address: Option<String>,
    pub avatar_url: Option<String>,
}

fn present(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Clone)]
pub struct UserService {
    store: SharedStore,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(store: SharedStore, bcrypt_cost: u32) -> Self {
        Self { store, bcrypt_cost }
    }

    pub async fn profile(&self, id: UserId) -> ShopResult<User> {
        self.store
            .find_user(id)
            .await?
            .ok_or_else(|| ShopError::not_found("User"))
    }

    #[instrument(skip(self, update))]
    pub async fn update_profile(&self, id: UserId, update: ProfileUpdate) -> ShopResult<User> {
        let password_hash = match present(update.password) {
            Some(password) => {
                validate_password(&password)?;
                Some(hash_password(&password, self.bcrypt_cost)?)
            }
            None => None,
        };
        let patch = UserPatch {
            full_name: present(update.full_name),
            password_hash,
            role: None,
            address: present(update.address),
            avatar_url: present(update.avatar_url),
        };
        if patch.is_empty() {
            return Err(ShopError::validation("No valid fields to update"));
        }
        self.store.update_user(id, &patch).await
    }

    pub async fn list(&self) -> ShopResult<Vec<User>> {
        self.store.list_users().await
    }

    #[instrument(skip(self, update))]
    pub async fn admin_update(&self, id: UserId, update: AdminUserUpdate) -> ShopResult<User> {
        let patch = UserPatch {
            full_name: present(update.full_name),
            password_hash: None,
            role: update.role,
            address: present(update.address),
            avatar_url: present(update.avatar_url),
        };
        if patch.is_empty() {
            return Err(ShopError::validation("No valid fields to update"));
        }
        let user = self.store.update_user(id, &patch).await?;
        info!(user_id = %id, role = %user.role, "user updated by admin");
        Ok(user)
    }

    /// Block or unblock `target`. Admins cannot block themselves.
    #[instrument(skip(self))]
    pub async fn set_blocked(&self, actor: UserId, target: UserId, blocked: bool) -> ShopResult<User> {
        if blocked && actor == target {
            return Err(ShopError::validation("Admins cannot block their own account"));
        }
        let user = self.store.set_user_blocked(target, blocked).await?;
        info!(user_id = %target, blocked, "block flag changed");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::verify_password;
    use crate::memory::MemoryStore;
    use crate::store::UserStore;
    use crate::user::NewUser;
    use std::sync::Arc;

    async fn setup() -> (UserService, User) {
        let store = Arc::new(MemoryStore::new());
        let user = store
            .create_user(NewUser {
                full_name: "Meera".into(),
                email: "meera@example.com".into(),
                password_hash: hash_password("secret1", 4).unwrap(),
                address: "Old Street".into(),
                role: Role::User,
                is_verified: false,
            })
            .await
            .unwrap();
        (UserService::new(store, 4), user)
    }

    #[tokio::test]
    async fn test_profile_partial_update() {
        let (users, user) = setup().await;

        let updated = users
            .update_profile(
                user.id,
                ProfileUpdate {
                    address: Some("New Street".into()),
                    full_name: Some("   ".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.address, "New Street");
        assert_eq!(updated.full_name, "Meera");
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let (users, user) = setup().await;
        assert!(matches!(
            users.update_profile(user.id, ProfileUpdate::default()).await,
            Err(ShopError::Validation(_))
        ));
        assert!(matches!(
            users.admin_update(user.id, AdminUserUpdate::default()).await,
            Err(ShopError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_password_change_rehashes() {
        let (users, user) = setup().await;
        let updated = users
            .update_profile(
                user.id,
                ProfileUpdate {
                    password: Some("brand-new".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(verify_password("brand-new", &updated.password_hash));
    }

    #[tokio::test]
    async fn test_admin_role_and_block() {
        let (users, user) = setup().await;
        let admin = UserId::new(1000);

        let promoted = users
            .admin_update(
                user.id,
                AdminUserUpdate {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(promoted.is_admin());

        assert!(users.set_blocked(admin, user.id, true).await.unwrap().is_blocked);
        assert!(!users.set_blocked(admin, user.id, false).await.unwrap().is_blocked);
        assert!(users.set_blocked(user.id, user.id, true).await.is_err());
        assert!(matches!(
            users.set_blocked(admin, UserId::new(5555), true).await,
            Err(ShopError::NotFound(_))
        ));
    }
}
