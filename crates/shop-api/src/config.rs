//! # Application Configuration
//!
//! Everything the server reads from the environment, loaded once at startup.

use chrono::Duration;
use shop_core::{Currency, ShopError, ShopResult};
use std::net::SocketAddr;
use tracing::warn;

const DEV_JWT_SECRET: &str = "storefront-dev-secret-change-me";

/// Outbound SMTP settings
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Sender mailbox, e.g. `Storefront <no-reply@example.com>`
    pub from: String,
}

impl std::fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("from", &self.from)
            .finish_non_exhaustive()
    }
}

/// Data written at startup when the store lacks it
#[derive(Clone, Default)]
pub struct SeedConfig {
    /// Verified admin account, as `(email, password)`
    pub admin: Option<(String, String)>,
    /// Add the demo catalog while no products exist
    pub demo_catalog: bool,
}

impl std::fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedConfig")
            .field("admin", &self.admin.as_ref().map(|(email, _)| email))
            .field("demo_catalog", &self.demo_catalog)
            .finish()
    }
}

/// Application configuration
#[derive(Clone)]
pub struct AppConfig {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Environment (development, staging, production)
    pub environment: String,
    /// PostgreSQL URL; the in-memory store is used when absent
    pub database_url: Option<String>,
    pub database_max_connections: u32,
    /// HS256 signing secret for access tokens
    pub jwt_secret: String,
    pub access_token_ttl: Duration,
    pub refresh_token_ttl: Duration,
    pub otp_ttl: Duration,
    pub bcrypt_cost: u32,
    /// Currency sent to the payment gateway
    pub currency: Currency,
    /// SMTP transport; the outbox mailer is used when absent
    pub smtp: Option<SmtpConfig>,
    pub seed: SeedConfig,
}

impl AppConfig {
    /// Load from environment variables (and `.env` if present)
    pub fn from_env() -> ShopResult<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup
    pub fn from_lookup<F>(lookup: F) -> ShopResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let environment = get("ENVIRONMENT").unwrap_or_else(|| "development".to_string());
        let is_production = environment == "production";

        let jwt_secret = match get("JWT_SECRET") {
            Some(secret) => secret,
            None if is_production => {
                return Err(ShopError::Configuration(
                    "JWT_SECRET must be set in production".to_string(),
                ))
            }
            None => {
                warn!("JWT_SECRET not set, using a development secret");
                DEV_JWT_SECRET.to_string()
            }
        };

        let database_url = get("DATABASE_URL");
        if database_url.is_none() && is_production {
            return Err(ShopError::Configuration(
                "DATABASE_URL must be set in production".to_string(),
            ));
        }

        let smtp = match get("SMTP_HOST") {
            Some(host) => Some(SmtpConfig {
                host,
                port: parse_or(get("SMTP_PORT"), "SMTP_PORT", 587)?,
                username: get("SMTP_USER").unwrap_or_default(),
                password: get("SMTP_PASS").unwrap_or_default(),
                from: get("SMTP_FROM").ok_or_else(|| {
                    ShopError::Configuration("SMTP_FROM must be set with SMTP_HOST".to_string())
                })?,
            }),
            None => None,
        };

        let seed = SeedConfig {
            admin: match (get("SEED_ADMIN_EMAIL"), get("SEED_ADMIN_PASSWORD")) {
                (Some(email), Some(password)) => Some((email, password)),
                (None, None) => None,
                _ => {
                    return Err(ShopError::Configuration(
                        "SEED_ADMIN_EMAIL and SEED_ADMIN_PASSWORD must be set together".to_string(),
                    ))
                }
            },
            demo_catalog: parse_or(get("SEED_DEMO_CATALOG"), "SEED_DEMO_CATALOG", false)?,
        };

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            port: parse_or(get("PORT"), "PORT", 8080)?,
            environment,
            database_url,
            database_max_connections: parse_or(
                get("DATABASE_MAX_CONNECTIONS"),
                "DATABASE_MAX_CONNECTIONS",
                10,
            )?,
            jwt_secret,
            access_token_ttl: seconds(get("ACCESS_TOKEN_TTL_SECS"), "ACCESS_TOKEN_TTL_SECS", 86_400)?,
            refresh_token_ttl: seconds(get("REFRESH_TOKEN_TTL_SECS"), "REFRESH_TOKEN_TTL_SECS", 300)?,
            otp_ttl: seconds(get("OTP_TTL_SECS"), "OTP_TTL_SECS", 300)?,
            bcrypt_cost: parse_or(get("BCRYPT_COST"), "BCRYPT_COST", 12)?,
            currency: match get("PAYMENT_CURRENCY") {
                Some(code) => code.parse()?,
                None => Currency::default(),
            },
            smtp,
            seed,
        })
    }

    /// Get the socket address to bind to
    pub fn socket_addr(&self) -> ShopResult<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| ShopError::Configuration(format!("Invalid socket address: {}", e)))
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("environment", &self.environment)
            .field("database", &self.database_url.is_some())
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .field("currency", &self.currency)
            .field("smtp", &self.smtp)
            .field("seed", &self.seed)
            .finish_non_exhaustive()
    }
}

fn parse_or<T: std::str::FromStr>(raw: Option<String>, key: &str, default: T) -> ShopResult<T> {
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ShopError::Configuration(format!("{} has an invalid value: {}", key, value))),
        None => Ok(default),
    }
}

fn seconds(raw: Option<String>, key: &str, default: i64) -> ShopResult<Duration> {
    let secs: i64 = parse_or(raw, key, default)?;
    if secs <= 0 {
        return Err(ShopError::Configuration(format!("{} must be positive", key)));
    }
    Ok(Duration::seconds(secs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> ShopResult<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.access_token_ttl, Duration::hours(24));
        assert_eq!(config.refresh_token_ttl, Duration::minutes(5));
        assert_eq!(config.otp_ttl, Duration::minutes(5));
        assert_eq!(config.currency, Currency::INR);
        assert!(config.database_url.is_none());
        assert!(config.smtp.is_none());
        assert!(config.seed.admin.is_none());
        assert!(!config.seed.demo_catalog);
        assert!(!config.is_production());
        assert_eq!(config.socket_addr().unwrap().port(), 8080);
    }

    #[test]
    fn test_production_requires_secrets() {
        assert!(matches!(
            load(&[("ENVIRONMENT", "production"), ("DATABASE_URL", "postgres://x")]),
            Err(ShopError::Configuration(_))
        ));
        assert!(matches!(
            load(&[("ENVIRONMENT", "production"), ("JWT_SECRET", "s3cret")]),
            Err(ShopError::Configuration(_))
        ));
        let config = load(&[
            ("ENVIRONMENT", "production"),
            ("JWT_SECRET", "s3cret"),
            ("DATABASE_URL", "postgres://x"),
        ])
        .unwrap();
        assert!(config.is_production());
    }

    #[test]
    fn test_invalid_numbers_rejected() {
        assert!(load(&[("PORT", "eighty")]).is_err());
        assert!(load(&[("REFRESH_TOKEN_TTL_SECS", "0")]).is_err());
        assert!(load(&[("PAYMENT_CURRENCY", "xyz")]).is_err());
    }

    #[test]
    fn test_smtp_requires_sender() {
        assert!(load(&[("SMTP_HOST", "smtp.example.com")]).is_err());
        let config = load(&[
            ("SMTP_HOST", "smtp.example.com"),
            ("SMTP_FROM", "Shop <no-reply@example.com>"),
            ("SMTP_PORT", "2525"),
        ])
        .unwrap();
        let smtp = config.smtp.unwrap();
        assert_eq!(smtp.port, 2525);
        assert!(!format!("{:?}", smtp).contains("password"));
    }

    #[test]
    fn test_seed_settings() {
        assert!(load(&[("SEED_ADMIN_EMAIL", "root@example.com")]).is_err());
        assert!(load(&[("SEED_DEMO_CATALOG", "yes")]).is_err());

        let config = load(&[
            ("SEED_ADMIN_EMAIL", "root@example.com"),
            ("SEED_ADMIN_PASSWORD", "hunter22"),
            ("SEED_DEMO_CATALOG", "true"),
        ])
        .unwrap();
        assert_eq!(
            config.seed.admin,
            Some(("root@example.com".to_string(), "hunter22".to_string()))
        );
        assert!(config.seed.demo_catalog);
        assert!(!format!("{:?}", config.seed).contains("hunter22"));
    }
}
