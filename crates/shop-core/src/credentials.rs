//! # Credentials
//!
//! Password hashing, signed access tokens and opaque refresh tokens.
//!
//! Access tokens are HS256 JWTs carrying the user id and role. Refresh
//! tokens are 32 random bytes, hex encoded; only their SHA-256 digest is
//! ever stored.

use crate::error::{ShopError, ShopResult};
use crate::id::{RefreshTokenId, UserId};
use crate::user::Role;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

const JWT_LEEWAY_SECS: u64 = 5;

/// Hash a password with bcrypt at the given cost
pub fn hash_password(plain: &str, cost: u32) -> ShopResult<String> {
    bcrypt::hash(plain, cost)
        .map_err(|e| ShopError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against a stored bcrypt hash; malformed hashes never match
pub fn verify_password(plain: &str, hash: &str) -> bool {
    bcrypt::verify(plain, hash).unwrap_or(false)
}

/// Access token payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id as a string, per RFC 7519
    pub sub: String,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

impl Claims {
    pub fn user_id(&self) -> ShopResult<UserId> {
        self.sub
            .parse::<i64>()
            .map(UserId::new)
            .map_err(|_| ShopError::Unauthorized("Invalid token subject".into()))
    }
}

/// The caller behind a verified access token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub user_id: UserId,
    pub role: Role,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

impl TryFrom<Claims> for Identity {
    type Error = ShopError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        Ok(Self {
            user_id: claims.user_id()?,
            role: claims.role,
        })
    }
}

/// Issues and verifies HS256 access tokens
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(secret: &[u8], ttl: Duration) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = JWT_LEEWAY_SECS;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Self {
            encoding: EncodingKey::from_secret(secret),
            decoding: DecodingKey::from_secret(secret),
            validation,
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Sign a token for `user_id` with `role`
    pub fn issue(&self, user_id: UserId, role: Role) -> ShopResult<String> {
        self.issue_at(user_id, role, Utc::now())
    }

    pub fn issue_at(&self, user_id: UserId, role: Role, now: DateTime<Utc>) -> ShopResult<String> {
        let claims = Claims {
            sub: user_id.to_string(),
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ShopError::Internal(format!("Token signing failed: {}", e)))
    }

    /// Verify signature, algorithm and expiry, returning the claims
    pub fn verify(&self, token: &str) -> ShopResult<Claims> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "access token rejected");
                ShopError::Unauthorized("Invalid or expired token".into())
            })
    }
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

/// A freshly generated refresh token: the plaintext goes to the client, the
/// hash goes to the store
#[derive(Debug, Clone)]
pub struct RefreshSecret {
    pub plaintext: String,
    pub hash: String,
}

pub fn issue_refresh_token() -> RefreshSecret {
    let mut bytes = [0u8; 32];
    OsRng.fill_bytes(&mut bytes);
    let plaintext = hex::encode(bytes);
    let hash = hash_token(&plaintext);
    RefreshSecret { plaintext, hash }
}

/// A stored refresh token; only the digest is kept
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshToken {
    pub id: RefreshTokenId,
    pub user_id: UserId,
    #[serde(skip_serializing)]
    pub token_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }
}

/// SHA-256 of a presented refresh token, hex encoded
pub fn hash_token(plaintext: &str) -> String {
    hex::encode(Sha256::digest(plaintext.as_bytes()))
}
