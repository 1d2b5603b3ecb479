//! # Application State
//!
//! Shared state for the Axum application: configuration, the store, the
//! mailer and one handle per workflow service.

use crate::config::AppConfig;
use crate::mailer::SmtpMailer;
use crate::seed;
use shop_core::{
    AuthService, AuthSettings, CartService, CatalogService, GatewaySelector, MemoryStore,
    OrderService, OtpService, OutboxMailer, PaymentService, SharedMailer, SharedStore, ShopResult,
    TokenIssuer, UserService, WishlistService,
};
use shop_postgres::PgStore;
use shop_stripe::StripePaymentGateway;
use std::sync::Arc;
use tracing::{info, warn};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub store: SharedStore,
    pub mailer: SharedMailer,
    pub auth: AuthService,
    pub users: UserService,
    pub catalog: CatalogService,
    pub cart: CartService,
    pub wishlist: WishlistService,
    pub orders: OrderService,
    pub payments: PaymentService,
}

impl AppState {
    /// Connect the backends named by the configuration
    pub async fn from_config(config: AppConfig) -> ShopResult<Self> {
        let store: SharedStore = match &config.database_url {
            Some(url) => {
                let pg = PgStore::connect(url, config.database_max_connections).await?;
                pg.migrate().await?;
                info!("Using PostgreSQL store");
                Arc::new(pg)
            }
            None => {
                warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
                Arc::new(MemoryStore::new())
            }
        };
        seed::run(&store, &config.seed, config.bcrypt_cost).await?;

        let mailer: SharedMailer = match &config.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
            None => {
                warn!("SMTP_HOST not set, OTP emails are kept in memory");
                Arc::new(OutboxMailer::new())
            }
        };

        let mut gateways = GatewaySelector::default();
        match StripePaymentGateway::from_env() {
            Ok(stripe) => {
                info!(test_mode = stripe.config().is_test_mode(), "Stripe gateway configured");
                gateways.register(Arc::new(stripe));
            }
            Err(e) => warn!(error = %e, "Stripe not configured, payment endpoints will fail"),
        }

        Ok(Self::from_parts(config, store, mailer, gateways))
    }

    /// Wire services over already-built backends
    pub fn from_parts(
        config: AppConfig,
        store: SharedStore,
        mailer: SharedMailer,
        gateways: GatewaySelector,
    ) -> Self {
        let otp = OtpService::new(store.clone(), mailer.clone(), config.otp_ttl);
        let tokens = TokenIssuer::new(config.jwt_secret.as_bytes(), config.access_token_ttl);
        let settings = AuthSettings {
            refresh_ttl: config.refresh_token_ttl,
            bcrypt_cost: config.bcrypt_cost,
        };

        Self {
            auth: AuthService::new(store.clone(), otp, tokens, settings),
            users: UserService::new(store.clone(), config.bcrypt_cost),
            catalog: CatalogService::new(store.clone()),
            cart: CartService::new(store.clone()),
            wishlist: WishlistService::new(store.clone()),
            orders: OrderService::new(store.clone()),
            payments: PaymentService::new(store.clone(), gateways, config.currency),
            config: Arc::new(config),
            store,
            mailer,
        }
    }
}
