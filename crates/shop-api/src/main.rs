//! # Storefront
//!
//! E-commerce backend: OTP signup, JWT sessions, catalog, cart, orders and
//! Stripe payments.
//!
//! ## Usage
//!
//! ```bash
//! export DATABASE_URL=postgres://localhost/storefront
//! export JWT_SECRET=...
//! export STRIPE_SECRET_KEY=sk_test_...
//! export STRIPE_WEBHOOK_SECRET=whsec_...
//! export SEED_ADMIN_EMAIL=admin@example.com SEED_ADMIN_PASSWORD=...
//!
//! storefront
//! ```

use shop_api::{create_router, AppConfig, AppState};
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // Production logs are JSON lines
    let json_logs = std::env::var("ENVIRONMENT").is_ok_and(|env| env == "production");
    let filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();
    if json_logs {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer())
            .with(filter)
            .init();
    }

    print_banner();

    let config = AppConfig::from_env()?;
    let addr = config.socket_addr()?;
    let is_prod = config.is_production();
    info!("Environment: {}", config.environment);

    let state = AppState::from_config(config).await?;
    info!(
        store = state.store.backend(),
        mailer = state.mailer.transport_name(),
        "Payment providers: {:?}",
        state.payments.gateways().providers()
    );

    let app = create_router(state);

    info!("Storefront starting on http://{}", addr);
    if !is_prod {
        info!("Health: http://{}/health", addr);
        info!("Webhook: POST http://{}/webhook/stripe", addr);
    }

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn print_banner() {
    println!(
        r#"
  Storefront RS
  ━━━━━━━━━━━━━━━━━━━━━━━
  Shop backend
  Version: {}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
