//! Signup, login, OTP flows and refresh-token rotation.

use crate::credentials::{
    hash_password, hash_token, issue_refresh_token, verify_password, Identity, TokenIssuer,
};
use crate::error::{ShopError, ShopResult};
use crate::otp::{RESET_PASSWORD, SIGNUP};
use crate::services::otp::OtpService;
use crate::store::SharedStore;
use crate::user::{is_valid_email, normalize_email, NewUser, Role, User, UserPatch};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

pub const MIN_PASSWORD_LEN: usize = 6;

/// Lifetimes and hashing cost for credentials
#[derive(Debug, Clone, Copy)]
pub struct AuthSettings {
    pub refresh_ttl: Duration,
    pub bcrypt_cost: u32,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            refresh_ttl: Duration::minutes(5),
            bcrypt_cost: bcrypt::DEFAULT_COST,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub address: String,
}

/// Tokens handed out by login and refresh.
///
/// `refresh_token` is plaintext and only ever leaves the server as a cookie.
#[derive(Debug, Clone, Serialize)]
pub struct SessionTokens {
    pub user_id: i64,
    pub access_token: String,
    #[serde(skip)]
    pub refresh_token: String,
    #[serde(skip)]
    pub refresh_expires_at: DateTime<Utc>,
}

pub fn validate_password(password: &str) -> ShopResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ShopError::validation(format!(
            "Password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct AuthService {
    store: SharedStore,
    otp: OtpService,
    tokens: TokenIssuer,
    settings: AuthSettings,
}

impl AuthService {
    pub fn new(
        store: SharedStore,
        otp: OtpService,
        tokens: TokenIssuer,
        settings: AuthSettings,
    ) -> Self {
        Self {
            store,
            otp,
            tokens,
            settings,
        }
    }

    /// Create an unverified account and send its signup code
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn signup(&self, request: SignupRequest) -> ShopResult<User> {
        let email = normalize_email(&request.email);
        if request.full_name.trim().is_empty() {
            return Err(ShopError::validation("Full name is required"));
        }
        if !is_valid_email(&email) {
            return Err(ShopError::validation("Invalid email address"));
        }
        validate_password(&request.password)?;

        if self.store.find_user_by_email(&email).await?.is_some() {
            return Err(ShopError::Conflict("Email already registered".into()));
        }

        let password_hash = hash_password(&request.password, self.settings.bcrypt_cost)?;
        let user = self
            .store
            .create_user(NewUser {
                full_name: request.full_name.trim().to_string(),
                email,
                password_hash,
                address: request.address,
                role: Role::User,
                is_verified: false,
            })
            .await?;

        self.otp.generate(&user, SIGNUP).await?;
        info!(user_id = %user.id, "account created");
        Ok(user)
    }

    #[instrument(skip(self, password))]
    pub async fn login(&self, email: &str, password: &str) -> ShopResult<SessionTokens> {
        let invalid = || ShopError::Unauthorized("Invalid email or password".into());

        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash) {
            debug!(user_id = %user.id, "password mismatch");
            return Err(invalid());
        }
        if !user.is_verified {
            return Err(ShopError::Unauthorized(
                "Please verify your email before login".into(),
            ));
        }
        if user.is_blocked {
            warn!(user_id = %user.id, "blocked user attempted login");
            return Err(ShopError::Forbidden("Account is blocked".into()));
        }

        let secret = issue_refresh_token();
        let expires_at = Utc::now() + self.settings.refresh_ttl;
        self.store
            .store_refresh_token(user.id, &secret.hash, expires_at)
            .await?;

        info!(user_id = %user.id, "login succeeded");
        Ok(SessionTokens {
            user_id: user.id.get(),
            access_token: self.tokens.issue(user.id, user.role)?,
            refresh_token: secret.plaintext,
            refresh_expires_at: expires_at,
        })
    }

    /// Exchange a live refresh token for a new access token and a new
    /// refresh token. The presented token stops working.
    #[instrument(skip_all)]
    pub async fn refresh(&self, presented: &str) -> ShopResult<SessionTokens> {
        let rejected = || ShopError::Unauthorized("Invalid or expired refresh token".into());
        let now = Utc::now();
        let presented_hash = hash_token(presented);

        let current = self
            .store
            .find_refresh_token(&presented_hash, now)
            .await?
            .ok_or_else(rejected)?;
        let user = self
            .store
            .find_user(current.user_id)
            .await?
            .ok_or_else(rejected)?;
        if user.is_blocked {
            self.store.delete_refresh_token(&presented_hash).await?;
            return Err(ShopError::Forbidden("Account is blocked".into()));
        }

        let secret = issue_refresh_token();
        let expires_at = now + self.settings.refresh_ttl;
        self.store
            .rotate_refresh_token(&presented_hash, &secret.hash, expires_at, now)
            .await?
            .ok_or_else(rejected)?;

        debug!(user_id = %user.id, "refresh token rotated");
        Ok(SessionTokens {
            user_id: user.id.get(),
            access_token: self.tokens.issue(user.id, user.role)?,
            refresh_token: secret.plaintext,
            refresh_expires_at: expires_at,
        })
    }

    /// Revoke a refresh token. Unknown tokens are not an error.
    #[instrument(skip_all)]
    pub async fn logout(&self, presented: &str) -> ShopResult<()> {
        let removed = self.store.delete_refresh_token(&hash_token(presented)).await?;
        debug!(removed, "logout");
        Ok(())
    }

    /// Resolve a bearer token into the caller's identity
    pub fn authenticate(&self, bearer: &str) -> ShopResult<Identity> {
        Identity::try_from(self.tokens.verify(bearer)?)
    }

    #[instrument(skip(self))]
    pub async fn send_otp(&self, email: &str, purpose: &str) -> ShopResult<()> {
        let user = self.user_by_email(email).await?;
        self.otp.generate(&user, purpose).await.map(|_| ())
    }

    /// Like `send_otp`, but refuses a signup code for a verified account
    #[instrument(skip(self))]
    pub async fn resend_otp(&self, email: &str, purpose: &str) -> ShopResult<()> {
        let user = self.user_by_email(email).await?;
        if purpose == SIGNUP && user.is_verified {
            return Err(ShopError::validation("User already verified"));
        }
        self.otp.generate(&user, purpose).await.map(|_| ())
    }

    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, email: &str, code: &str, purpose: &str) -> ShopResult<()> {
        let user = self.user_by_email(email).await?;
        self.otp.validate(&user, code, purpose).await
    }

    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> ShopResult<()> {
        let user = self.user_by_email(email).await?;
        self.otp.generate(&user, RESET_PASSWORD).await.map(|_| ())
    }

    #[instrument(skip(self, code, new_password))]
    pub async fn reset_password(&self, email: &str, code: &str, new_password: &str) -> ShopResult<()> {
        validate_password(new_password)?;
        let user = self.user_by_email(email).await?;
        self.otp.validate(&user, code, RESET_PASSWORD).await?;

        let patch = UserPatch {
            password_hash: Some(hash_password(new_password, self.settings.bcrypt_cost)?),
            ..Default::default()
        };
        self.store.update_user(user.id, &patch).await?;
        info!(user_id = %user.id, "password reset");
        Ok(())
    }

    async fn user_by_email(&self, email: &str) -> ShopResult<User> {
        self.store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or_else(|| ShopError::not_found("User"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::OutboxMailer;
    use crate::memory::MemoryStore;
    use crate::store::UserStore;
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        mailer: Arc<OutboxMailer>,
        auth: AuthService,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(OutboxMailer::new());
        let shared: SharedStore = store.clone();
        let otp = OtpService::new(shared.clone(), mailer.clone(), Duration::minutes(5));
        let auth = AuthService::new(
            shared,
            otp,
            TokenIssuer::new(b"unit-test-secret", Duration::hours(24)),
            AuthSettings {
                refresh_ttl: Duration::minutes(5),
                bcrypt_cost: 4,
            },
        );
        Fixture {
            store,
            mailer,
            auth,
        }
    }

    fn signup_request(email: &str) -> SignupRequest {
        SignupRequest {
            full_name: "Ravi Kumar".into(),
            email: email.into(),
            password: "secret1".into(),
            address: "12 MG Road".into(),
        }
    }

    async fn last_code(mailer: &OutboxMailer, email: &str) -> String {
        let body = mailer.last_to(email).await.unwrap().body;
        body.split_whitespace()
            .map(|w| w.trim_end_matches('.'))
            .find(|w| w.len() == 6 && w.chars().all(|c| c.is_ascii_digit()))
            .unwrap()
            .to_string()
    }

    async fn verified_session(f: &Fixture, email: &str) -> SessionTokens {
        f.auth.signup(signup_request(email)).await.unwrap();
        let code = last_code(&f.mailer, email).await;
        f.auth.verify_otp(email, &code, SIGNUP).await.unwrap();
        f.auth.login(email, "secret1").await.unwrap()
    }

    #[tokio::test]
    async fn test_signup_creates_unverified_user() {
        let f = fixture();
        let user = f.auth.signup(signup_request("Ravi@Example.com")).await.unwrap();

        assert_eq!(user.email, "ravi@example.com");
        assert!(!user.is_verified);
        assert!(f.mailer.last_to("ravi@example.com").await.is_some());
    }

    #[tokio::test]
    async fn test_signup_validation_and_duplicates() {
        let f = fixture();
        let mut short = signup_request("a@example.com");
        short.password = "12345".into();
        assert!(matches!(
            f.auth.signup(short).await,
            Err(ShopError::Validation(_))
        ));
        assert!(matches!(
            f.auth.signup(signup_request("not-an-email")).await,
            Err(ShopError::Validation(_))
        ));

        f.auth.signup(signup_request("a@example.com")).await.unwrap();
        assert!(matches!(
            f.auth.signup(signup_request("A@example.com")).await,
            Err(ShopError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_login_requires_verification() {
        let f = fixture();
        f.auth.signup(signup_request("b@example.com")).await.unwrap();

        let err = f.auth.login("b@example.com", "secret1").await.unwrap_err();
        assert!(matches!(err, ShopError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_password_and_blocked_user() {
        let f = fixture();
        let session = verified_session(&f, "c@example.com").await;

        assert!(matches!(
            f.auth.login("c@example.com", "wrong-pass").await,
            Err(ShopError::Unauthorized(_))
        ));
        assert!(matches!(
            f.auth.login("nobody@example.com", "secret1").await,
            Err(ShopError::Unauthorized(_))
        ));

        let id = crate::id::UserId::new(session.user_id);
        f.store.set_user_blocked(id, true).await.unwrap();
        assert!(matches!(
            f.auth.login("c@example.com", "secret1").await,
            Err(ShopError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_access_token_authenticates() {
        let f = fixture();
        let session = verified_session(&f, "d@example.com").await;

        let identity = f.auth.authenticate(&session.access_token).unwrap();
        assert_eq!(identity.user_id.get(), session.user_id);
        assert_eq!(identity.role, Role::User);
        assert!(f.auth.authenticate("garbage").is_err());
    }

    #[tokio::test]
    async fn test_refresh_rotates_token() {
        let f = fixture();
        let session = verified_session(&f, "e@example.com").await;

        let rotated = f.auth.refresh(&session.refresh_token).await.unwrap();
        assert_ne!(rotated.refresh_token, session.refresh_token);

        assert!(matches!(
            f.auth.refresh(&session.refresh_token).await,
            Err(ShopError::Unauthorized(_))
        ));
        f.auth.refresh(&rotated.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_refresh_reflects_current_role() {
        let f = fixture();
        let session = verified_session(&f, "f@example.com").await;
        let id = crate::id::UserId::new(session.user_id);
        f.store
            .update_user(
                id,
                &UserPatch {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let rotated = f.auth.refresh(&session.refresh_token).await.unwrap();
        assert!(f.auth.authenticate(&rotated.access_token).unwrap().is_admin());
    }

    #[tokio::test]
    async fn test_logged_out_token_never_refreshes() {
        let f = fixture();
        let session = verified_session(&f, "g@example.com").await;

        f.auth.logout(&session.refresh_token).await.unwrap();
        assert!(matches!(
            f.auth.refresh(&session.refresh_token).await,
            Err(ShopError::Unauthorized(_))
        ));
        f.auth.logout(&session.refresh_token).await.unwrap();
    }

    #[tokio::test]
    async fn test_resend_refused_for_verified_user() {
        let f = fixture();
        verified_session(&f, "h@example.com").await;

        assert!(matches!(
            f.auth.resend_otp("h@example.com", SIGNUP).await,
            Err(ShopError::Validation(_))
        ));
        f.auth.resend_otp("h@example.com", RESET_PASSWORD).await.unwrap();
        assert!(matches!(
            f.auth.send_otp("missing@example.com", SIGNUP).await,
            Err(ShopError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let f = fixture();
        verified_session(&f, "i@example.com").await;

        f.auth.forgot_password("i@example.com").await.unwrap();
        let code = last_code(&f.mailer, "i@example.com").await;
        f.auth
            .reset_password("i@example.com", &code, "new-secret")
            .await
            .unwrap();

        assert!(f.auth.login("i@example.com", "secret1").await.is_err());
        f.auth.login("i@example.com", "new-secret").await.unwrap();
        assert!(matches!(
            f.auth.reset_password("i@example.com", &code, "another").await,
            Err(ShopError::NotFound(_))
        ));
    }
}
