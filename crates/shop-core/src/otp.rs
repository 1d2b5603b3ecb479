//! # One-Time Passcodes
//!
//! Six-digit codes scoped to a `(user, purpose)` pair. Each request stores a
//! fresh record; validation only ever looks at the newest unused one, so
//! older codes are superseded without being deleted.

use crate::error::{ShopError, ShopResult};
use crate::id::{OtpId, UserId};
use chrono::{DateTime, Utc};
use rand::rngs::OsRng;
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Purpose tag for account verification
pub const SIGNUP: &str = "signup";
/// Purpose tag for password reset
pub const RESET_PASSWORD: &str = "reset_password";

const CODE_DIGITS: usize = 6;
const MAX_PURPOSE_LEN: usize = 64;

/// A stored passcode
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Otp {
    pub id: OtpId,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub code: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
    pub is_used: bool,
    pub created_at: DateTime<Utc>,
}

impl Otp {
    /// Check a presented code against this record at instant `now`.
    /// Expiry wins over a wrong code.
    pub fn check(&self, code: &str, now: DateTime<Utc>) -> ShopResult<()> {
        if now > self.expires_at {
            return Err(ShopError::OtpExpired);
        }
        if !codes_match(&self.code, code.trim()) {
            return Err(ShopError::OtpMismatch);
        }
        Ok(())
    }
}

/// Fields for a new passcode record
#[derive(Debug, Clone)]
pub struct NewOtp {
    pub user_id: UserId,
    pub code: String,
    pub purpose: String,
    pub expires_at: DateTime<Utc>,
}

/// Draw a zero-padded six digit code from the OS CSPRNG
pub fn generate_code() -> String {
    let n: u32 = OsRng.gen_range(0..1_000_000);
    format!("{:0width$}", n, width = CODE_DIGITS)
}

pub fn validate_purpose(purpose: &str) -> ShopResult<()> {
    if purpose.trim().is_empty() {
        return Err(ShopError::validation("OTP purpose is required"));
    }
    if purpose.len() > MAX_PURPOSE_LEN {
        return Err(ShopError::validation("OTP purpose is too long"));
    }
    Ok(())
}

fn codes_match(expected: &str, presented: &str) -> bool {
    if expected.len() != presented.len() {
        return false;
    }
    expected
        .bytes()
        .zip(presented.bytes())
        .fold(0u8, |acc, (a, b)| acc | (a ^ b))
        == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn otp(code: &str, expires_at: DateTime<Utc>) -> Otp {
        Otp {
            id: OtpId::new(1),
            user_id: UserId::new(42),
            code: code.into(),
            purpose: SIGNUP.into(),
            expires_at,
            is_used: false,
            created_at: expires_at - Duration::minutes(5),
        }
    }

    #[test]
    fn test_generated_codes_are_six_digits() {
        for _ in 0..200 {
            let code = generate_code();
            assert_eq!(code.len(), 6);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
        }
    }

    #[test]
    fn test_check_outcomes() {
        let now = Utc::now();
        let record = otp("123456", now + Duration::minutes(5));

        assert!(record.check("123456", now).is_ok());
        assert!(matches!(record.check("654321", now), Err(ShopError::OtpMismatch)));
        assert!(matches!(
            record.check("123456", now + Duration::minutes(6)),
            Err(ShopError::OtpExpired)
        ));
    }

    #[test]
    fn test_purpose_validation() {
        assert!(validate_purpose(RESET_PASSWORD).is_ok());
        assert!(validate_purpose("  ").is_err());
    }
}
