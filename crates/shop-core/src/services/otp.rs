//! OTP issuance and validation.

use crate::error::{ShopError, ShopResult};
use crate::mailer::{Email, SharedMailer};
use crate::otp::{generate_code, validate_purpose, NewOtp};
use crate::store::SharedStore;
use crate::user::User;
use chrono::{DateTime, Duration, Utc};
use tracing::{info, instrument, warn};

#[derive(Clone)]
pub struct OtpService {
    store: SharedStore,
    mailer: SharedMailer,
    ttl: Duration,
}

impl OtpService {
    pub fn new(store: SharedStore, mailer: SharedMailer, ttl: Duration) -> Self {
        Self { store, mailer, ttl }
    }

    /// Store a fresh code for `(user, purpose)` and email it.
    ///
    /// The row is written before the email goes out, so a transport failure
    /// leaves an unused code behind and surfaces as `Upstream`.
    #[instrument(skip(self, user), fields(user_id = %user.id))]
    pub async fn generate(&self, user: &User, purpose: &str) -> ShopResult<String> {
        validate_purpose(purpose)?;
        let code = generate_code();
        let expires_at = Utc::now() + self.ttl;

        self.store
            .create_otp(NewOtp {
                user_id: user.id,
                code: code.clone(),
                purpose: purpose.to_string(),
                expires_at,
            })
            .await?;

        let email = Email::new(
            user.email.clone(),
            format!("Your {} code", purpose.replace('_', " ")),
            format!(
                "Hello {},\n\nYour one-time code for {} is {}.\nIt expires in {} minutes.\n",
                user.full_name,
                purpose,
                code,
                self.ttl.num_minutes()
            ),
        );
        if let Err(e) = self.mailer.send(email).await {
            warn!(error = %e, transport = self.mailer.transport_name(), "OTP email failed");
            return Err(match e {
                ShopError::Upstream { .. } => e,
                other => ShopError::upstream(self.mailer.transport_name(), other.to_string()),
            });
        }

        info!("OTP issued");
        Ok(code)
    }

    pub async fn validate(&self, user: &User, code: &str, purpose: &str) -> ShopResult<()> {
        self.validate_at(user, code, purpose, Utc::now()).await
    }

    /// Validate as of instant `now`
    #[instrument(skip(self, user, code), fields(user_id = %user.id))]
    pub async fn validate_at(
        &self,
        user: &User,
        code: &str,
        purpose: &str,
        now: DateTime<Utc>,
    ) -> ShopResult<()> {
        validate_purpose(purpose)?;
        self.store.consume_otp(user.id, purpose, code, now).await?;
        info!("OTP validated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::OutboxMailer;
    use crate::memory::MemoryStore;
    use crate::otp::SIGNUP;
    use crate::store::{Store, UserStore};
    use crate::user::{NewUser, Role};
    use std::sync::Arc;

    struct Fixture {
        store: Arc<MemoryStore>,
        mailer: Arc<OutboxMailer>,
        service: OtpService,
        user: User,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(OutboxMailer::new());
        let user = store
            .create_user(NewUser {
                full_name: "Asha".into(),
                email: "asha@example.com".into(),
                password_hash: "x".into(),
                address: String::new(),
                role: Role::User,
                is_verified: false,
            })
            .await
            .unwrap();
        let service = OtpService::new(
            store.clone() as Arc<dyn Store>,
            mailer.clone(),
            Duration::minutes(5),
        );
        Fixture {
            store,
            mailer,
            service,
            user,
        }
    }

    #[tokio::test]
    async fn test_code_is_emailed() {
        let f = fixture().await;
        let code = f.service.generate(&f.user, SIGNUP).await.unwrap();

        let email = f.mailer.last_to("asha@example.com").await.unwrap();
        assert!(email.body.contains(&code));
        assert!(email.body.contains(SIGNUP));
    }

    #[tokio::test]
    async fn test_signup_code_verifies_user_once() {
        let f = fixture().await;
        let code = f.service.generate(&f.user, SIGNUP).await.unwrap();

        f.service.validate(&f.user, &code, SIGNUP).await.unwrap();
        let user = f.store.find_user(f.user.id).await.unwrap().unwrap();
        assert!(user.is_verified);

        let again = f.service.validate(&f.user, &code, SIGNUP).await;
        assert!(matches!(again, Err(ShopError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_wrong_code_keeps_record_usable() {
        let f = fixture().await;
        let code = f.service.generate(&f.user, SIGNUP).await.unwrap();
        let wrong = if code == "000000" { "111111" } else { "000000" };

        let err = f.service.validate(&f.user, wrong, SIGNUP).await.unwrap_err();
        assert!(matches!(err, ShopError::OtpMismatch));

        f.service.validate(&f.user, &code, SIGNUP).await.unwrap();
    }

    #[tokio::test]
    async fn test_expired_code_rejected() {
        let f = fixture().await;
        let code = f.service.generate(&f.user, SIGNUP).await.unwrap();
        let later = Utc::now() + Duration::minutes(5) + Duration::seconds(1);

        let err = f
            .service
            .validate_at(&f.user, &code, SIGNUP, later)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::OtpExpired));
    }

    #[tokio::test]
    async fn test_newest_code_supersedes_older() {
        let f = fixture().await;
        let first = f.service.generate(&f.user, SIGNUP).await.unwrap();
        let second = f.service.generate(&f.user, SIGNUP).await.unwrap();

        if first != second {
            let err = f.service.validate(&f.user, &first, SIGNUP).await.unwrap_err();
            assert!(matches!(err, ShopError::OtpMismatch));
        }
        f.service.validate(&f.user, &second, SIGNUP).await.unwrap();
    }

    #[tokio::test]
    async fn test_purpose_scoping() {
        let f = fixture().await;
        let code = f.service.generate(&f.user, SIGNUP).await.unwrap();

        let err = f
            .service
            .validate(&f.user, &code, "reset_password")
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_mail_failure_is_upstream() {
        let f = fixture().await;
        f.mailer.set_failing(true);

        let err = f.service.generate(&f.user, SIGNUP).await.unwrap_err();
        assert!(matches!(err, ShopError::Upstream { .. }));
    }
}
