//! End-to-end HTTP tests over the in-memory store.

use async_trait::async_trait;
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum_test::TestServer;
use serde_json::{json, Value};
use shop_api::config::SeedConfig;
use shop_api::{create_router, seed, AppConfig, AppState};
use shop_core::{
    AdminUserUpdate, GatewayEvent, GatewaySelector, IntentRequest, MemoryStore, OutboxMailer,
    PaymentGateway, PaymentIntent, Role, ShopError, ShopResult, UserId,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

const PASSWORD: &str = "secret123";

/// Registers as "stripe"; accepts the signature "valid" and reads the
/// payload as a `GatewayEvent`
#[derive(Default)]
struct StubStripe {
    issued: AtomicUsize,
}

#[async_trait]
impl PaymentGateway for StubStripe {
    async fn create_payment_intent(&self, _request: &IntentRequest) -> ShopResult<PaymentIntent> {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(PaymentIntent {
            gateway_id: format!("pi_{}", n),
            client_secret: format!("pi_{}_secret", n),
        })
    }

    async fn verify_webhook(&self, payload: &[u8], signature: &str) -> ShopResult<GatewayEvent> {
        if signature != "valid" {
            return Err(ShopError::Unauthorized("Invalid webhook signature".into()));
        }
        serde_json::from_slice(payload).map_err(|e| ShopError::validation(e.to_string()))
    }

    fn provider_name(&self) -> &'static str {
        "stripe"
    }
}

struct TestApp {
    server: TestServer,
    state: AppState,
    outbox: Arc<OutboxMailer>,
}

fn app() -> TestApp {
    let config = AppConfig::from_lookup(|key| match key {
        "JWT_SECRET" => Some("integration-secret".to_string()),
        "BCRYPT_COST" => Some("4".to_string()),
        _ => None,
    })
    .unwrap();
    let outbox = Arc::new(OutboxMailer::new());
    let gateways = GatewaySelector::default().with_gateway(Arc::new(StubStripe::default()));
    let state = AppState::from_parts(
        config,
        Arc::new(MemoryStore::new()),
        outbox.clone(),
        gateways,
    );
    let server = TestServer::new(create_router(state.clone())).unwrap();
    TestApp {
        server,
        state,
        outbox,
    }
}

fn stripe_signature(value: &'static str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("stripe-signature"),
        HeaderValue::from_static(value),
    )
}

impl TestApp {
    async fn last_code(&self, email: &str) -> String {
        let mail = self.outbox.last_to(email).await.expect("no email sent");
        mail.body
            .split(|c: char| !c.is_ascii_digit())
            .find(|run| run.len() == 6)
            .expect("no code in email")
            .to_string()
    }

    async fn signup_verified(&self, email: &str) -> i64 {
        let response = self
            .server
            .post("/auth/signup")
            .json(&json!({
                "full_name": "Asha Rao",
                "email": email,
                "password": PASSWORD,
                "address": "12 MG Road, Bengaluru",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        let id = response.json::<Value>()["id"].as_i64().unwrap();

        let otp = self.last_code(email).await;
        self.server
            .post("/auth/verify-otp")
            .json(&json!({ "email": email, "otp": otp, "purpose": "signup" }))
            .await
            .assert_status_ok();
        id
    }

    async fn login(&self, email: &str) -> String {
        let response = self
            .server
            .post("/auth/login")
            .json(&json!({ "email": email, "password": PASSWORD }))
            .await;
        response.assert_status_ok();
        response.json::<Value>()["access_token"]
            .as_str()
            .unwrap()
            .to_string()
    }

    async fn customer(&self, email: &str) -> (i64, String) {
        let id = self.signup_verified(email).await;
        (id, self.login(email).await)
    }

    async fn admin(&self) -> String {
        let id = self.signup_verified("admin@example.com").await;
        self.state
            .users
            .admin_update(
                UserId::new(id),
                AdminUserUpdate {
                    role: Some(Role::Admin),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        self.login("admin@example.com").await
    }

    async fn product(&self, admin: &str, stock: i32) -> i64 {
        let response = self
            .server
            .post("/admin/products")
            .authorization_bearer(admin)
            .json(&json!({
                "name": "Brass Lamp",
                "price": 49_900,
                "stock_quantity": stock,
                "category": "home",
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }

    async fn stock_of(&self, product_id: i64) -> i64 {
        self.server
            .get(&format!("/products/{}", product_id))
            .await
            .json::<Value>()["stock_quantity"]
            .as_i64()
            .unwrap()
    }

    /// Cart `quantity` of the product and check out; returns the order id
    async fn order(&self, token: &str, product_id: i64, quantity: i32) -> i64 {
        self.server
            .post("/cart")
            .authorization_bearer(token)
            .json(&json!({ "product_id": product_id, "quantity": quantity }))
            .await
            .assert_status(StatusCode::CREATED);
        let response = self
            .server
            .post("/order")
            .authorization_bearer(token)
            .json(&json!({}))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["id"].as_i64().unwrap()
    }
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let response = app.server.get("/health").await;

    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["store"], "memory");
    assert_eq!(body["payment_providers"], json!(["stripe"]));
}

#[tokio::test]
async fn test_login_requires_verified_email() {
    let app = app();
    app.server
        .post("/auth/signup")
        .json(&json!({ "full_name": "Ravi", "email": "ravi@example.com", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::CREATED);

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "ravi@example.com", "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 401);
}

#[tokio::test]
async fn test_duplicate_signup_conflicts() {
    let app = app();
    app.signup_verified("asha@example.com").await;

    let response = app
        .server
        .post("/auth/signup")
        .json(&json!({ "full_name": "Asha", "email": "ASHA@example.com", "password": PASSWORD }))
        .await;
    response.assert_status(StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_refresh_rotates_cookie_and_logout_revokes() {
    let app = app();
    app.signup_verified("asha@example.com").await;

    let login = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "asha@example.com", "password": PASSWORD }))
        .await;
    login.assert_status_ok();
    assert!(login.json::<Value>().get("refresh_token").is_none());
    let first = login.cookie("refresh_token");
    assert!(first.http_only().unwrap_or(false));

    let refreshed = app.server.post("/auth/refresh").add_cookie(first.clone()).await;
    refreshed.assert_status_ok();
    assert!(refreshed.json::<Value>()["access_token"].is_string());
    let second = refreshed.cookie("refresh_token");
    assert_ne!(first.value(), second.value());

    // The rotated-out token is dead
    app.server
        .post("/auth/refresh")
        .add_cookie(first)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    app.server
        .post("/auth/logout")
        .add_cookie(second.clone())
        .await
        .assert_status_ok();
    app.server
        .post("/auth/refresh")
        .add_cookie(second)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_refresh_without_cookie() {
    let app = app();
    app.server
        .post("/auth/refresh")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post("/auth/logout")
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_password_reset_flow() {
    let app = app();
    app.signup_verified("asha@example.com").await;

    app.server
        .post("/auth/forgot-password")
        .json(&json!({ "email": "asha@example.com" }))
        .await
        .assert_status_ok();
    let otp = app.last_code("asha@example.com").await;

    app.server
        .post("/auth/reset-password")
        .json(&json!({ "email": "asha@example.com", "otp": "000000x", "new_password": "brandnew1" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    app.server
        .post("/auth/reset-password")
        .json(&json!({ "email": "asha@example.com", "otp": otp, "new_password": "brandnew1" }))
        .await
        .assert_status_ok();

    app.server
        .post("/auth/login")
        .json(&json!({ "email": "asha@example.com", "password": "brandnew1" }))
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_protected_routes_require_bearer() {
    let app = app();

    let response = app.server.get("/cart").await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    let body = response.json::<Value>();
    assert_eq!(body["code"], 401);
    assert!(body["error"].as_str().unwrap().contains("Missing bearer token"));

    app.server
        .get("/user/profile")
        .authorization_bearer("not-a-jwt")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_admin_routes_reject_customers() {
    let app = app();
    let (_, customer) = app.customer("asha@example.com").await;
    let admin = app.admin().await;

    app.server
        .get("/admin/users")
        .authorization_bearer(&customer)
        .await
        .assert_status(StatusCode::FORBIDDEN);
    app.server
        .get("/admin/users")
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let users = app
        .server
        .get("/admin/users")
        .authorization_bearer(&admin)
        .await;
    users.assert_status_ok();
    let listed = users.json::<Value>();
    assert_eq!(listed.as_array().unwrap().len(), 2);
    assert!(listed[0].get("password_hash").is_none());
}

#[tokio::test]
async fn test_profile_update_ignores_blank_fields() {
    let app = app();
    let (_, token) = app.customer("asha@example.com").await;

    let response = app
        .server
        .put("/user/profile")
        .authorization_bearer(&token)
        .json(&json!({ "full_name": "Asha R", "address": "" }))
        .await;
    response.assert_status_ok();
    let body = response.json::<Value>();
    assert_eq!(body["full_name"], "Asha R");
    assert_eq!(body["address"], "12 MG Road, Bengaluru");
}

#[tokio::test]
async fn test_blocked_user_cannot_login() {
    let app = app();
    let (id, _) = app.customer("asha@example.com").await;
    let admin = app.admin().await;

    app.server
        .post(&format!("/admin/users/{}/block", id))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    app.server
        .post("/auth/login")
        .json(&json!({ "email": "asha@example.com", "password": PASSWORD }))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    app.server
        .post(&format!("/admin/users/{}/unblock", id))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    app.login("asha@example.com").await;
}

#[tokio::test]
async fn test_malformed_body_is_validation_error() {
    let app = app();
    let (_, token) = app.customer("asha@example.com").await;

    let response = app
        .server
        .post("/cart")
        .authorization_bearer(&token)
        .json(&json!({ "product_id": "lamp" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body = response.json::<Value>();
    assert_eq!(body["code"], 400);
    assert!(body["details"].is_string());

    app.server
        .get("/order/abc")
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_cart_rejects_quantity_over_stock() {
    let app = app();
    let admin = app.admin().await;
    let product = app.product(&admin, 3).await;
    let (_, token) = app.customer("asha@example.com").await;

    app.server
        .post("/cart")
        .authorization_bearer(&token)
        .json(&json!({ "product_id": product, "quantity": 2 }))
        .await
        .assert_status(StatusCode::CREATED);

    // Merged line would be 4 > 3
    let response = app
        .server
        .post("/cart")
        .authorization_bearer(&token)
        .json(&json!({ "product_id": product, "quantity": 2 }))
        .await;
    response.assert_status(StatusCode::CONFLICT);

    let cart = app
        .server
        .get("/cart")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(cart["items"][0]["quantity"], 2);
    assert_eq!(cart["total"], 99_800);
}

#[tokio::test]
async fn test_checkout_and_webhook_settlement() {
    let app = app();
    let admin = app.admin().await;
    let product = app.product(&admin, 3).await;
    let (_, token) = app.customer("asha@example.com").await;

    let order_id = app.order(&token, product, 2).await;
    assert_eq!(app.stock_of(product).await, 1);

    let order = app
        .server
        .get(&format!("/order/{}", order_id))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(order["status"], "pending");
    assert_eq!(order["total_amount"], 99_800);
    assert_eq!(order["shipping_address"], "12 MG Road, Bengaluru");
    assert_eq!(order["items"][0]["unit_price"], 49_900);

    let intent = app
        .server
        .post("/payments/create")
        .authorization_bearer(&token)
        .json(&json!({ "order_id": order_id }))
        .await;
    intent.assert_status(StatusCode::CREATED);
    let intent = intent.json::<Value>();
    assert_eq!(intent["client_secret"], "pi_1_secret");
    assert_eq!(intent["payment"]["gateway_payment_id"], "pi_1");

    let event = json!({
        "event_id": "evt_1",
        "kind": "PaymentSucceeded",
        "gateway_payment_id": "pi_1",
        "received_at": "2026-01-01T00:00:00Z",
    })
    .to_string();
    let (name, value) = stripe_signature("valid");
    let response = app
        .server
        .post("/webhook/stripe")
        .add_header(name.clone(), value.clone())
        .text(event.clone())
        .await;
    response.assert_status_ok();
    assert_eq!(response.json::<Value>()["received"], true);

    let order = app
        .server
        .get(&format!("/order/{}", order_id))
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(order["status"], "processing");

    // Redelivery is acknowledged and changes nothing
    app.server
        .post("/webhook/stripe")
        .add_header(name, value)
        .text(event)
        .await
        .assert_status_ok();
    assert_eq!(app.stock_of(product).await, 1);

    let all = app
        .server
        .get("/admin/orders")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(all.as_array().unwrap().len(), 1);

    let shipped = app
        .server
        .put(&format!("/admin/orders/{}", order_id))
        .authorization_bearer(&admin)
        .json(&json!({ "status": "shipped" }))
        .await;
    shipped.assert_status_ok();
    assert_eq!(shipped.json::<Value>()["status"], "shipped");
}

#[tokio::test]
async fn test_failed_payment_restores_stock() {
    let app = app();
    let admin = app.admin().await;
    let product = app.product(&admin, 3).await;
    let (_, token) = app.customer("asha@example.com").await;

    let order_id = app.order(&token, product, 3).await;
    assert_eq!(app.stock_of(product).await, 0);

    app.server
        .post("/payments/create")
        .authorization_bearer(&token)
        .json(&json!({ "order_id": order_id }))
        .await
        .assert_status(StatusCode::CREATED);

    let settled = app
        .server
        .put("/payments/pi_1/update")
        .authorization_bearer(&token)
        .json(&json!({ "status": "failed" }))
        .await;
    settled.assert_status_ok();
    let settled = settled.json::<Value>();
    assert_eq!(settled["order"]["status"], "failed");
    assert_eq!(settled["payment"]["status"], "failed");
    assert_eq!(app.stock_of(product).await, 3);

    app.server
        .put("/payments/pi_1/update")
        .authorization_bearer(&token)
        .json(&json!({ "status": "succeeded" }))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_order_cannot_be_deleted_mid_payment() {
    let app = app();
    let admin = app.admin().await;
    let product = app.product(&admin, 2).await;
    let (_, token) = app.customer("asha@example.com").await;
    let order_id = app.order(&token, product, 2).await;

    app.server
        .post("/payments/create")
        .authorization_bearer(&token)
        .json(&json!({ "order_id": order_id }))
        .await
        .assert_status(StatusCode::CREATED);

    app.server
        .delete(&format!("/order/{}", order_id))
        .authorization_bearer(&token)
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    app.server
        .put(&format!("/admin/orders/{}", order_id))
        .authorization_bearer(&admin)
        .json(&json!({ "status": "processing" }))
        .await
        .assert_status_ok();

    let settled = app
        .server
        .put("/payments/pi_1/update")
        .authorization_bearer(&token)
        .json(&json!({ "status": "failed" }))
        .await;
    settled.assert_status_ok();
    assert_eq!(settled.json::<Value>()["order"]["status"], "failed");
    assert_eq!(app.stock_of(product).await, 2);

    app.server
        .delete(&format!("/order/{}", order_id))
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
}

#[tokio::test]
async fn test_seeded_admin_can_log_in() {
    let app = app();
    let config = SeedConfig {
        admin: Some(("root@example.com".into(), PASSWORD.into())),
        demo_catalog: true,
    };
    seed::run(&app.state.store, &config, 4).await.unwrap();

    let response = app
        .server
        .post("/auth/login")
        .json(&json!({ "email": "root@example.com", "password": PASSWORD }))
        .await;
    response.assert_status_ok();
    let token = response.json::<Value>()["access_token"]
        .as_str()
        .unwrap()
        .to_string();

    app.server
        .get("/admin/users")
        .authorization_bearer(&token)
        .await
        .assert_status_ok();
    let products = app.server.get("/products").await.json::<Value>();
    assert!(!products.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_orders_are_private() {
    let app = app();
    let admin = app.admin().await;
    let product = app.product(&admin, 5).await;
    let (_, owner) = app.customer("asha@example.com").await;
    let (_, other) = app.customer("ravi@example.com").await;

    let order_id = app.order(&owner, product, 1).await;

    app.server
        .get(&format!("/order/{}", order_id))
        .authorization_bearer(&other)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .post("/payments/create")
        .authorization_bearer(&other)
        .json(&json!({ "order_id": order_id }))
        .await
        .assert_status(StatusCode::UNAUTHORIZED);
    app.server
        .get(&format!("/order/{}", order_id))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();

    let mine = app
        .server
        .get("/order")
        .authorization_bearer(&other)
        .await
        .json::<Value>();
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_webhook_signature_checks() {
    let app = app();

    app.server
        .post("/webhook/stripe")
        .text("{}")
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    let (name, value) = stripe_signature("forged");
    let response = app
        .server
        .post("/webhook/stripe")
        .add_header(name, value)
        .text("{}")
        .await;
    response.assert_status(StatusCode::UNAUTHORIZED);
    assert_eq!(response.json::<Value>()["code"], 401);
}

#[tokio::test]
async fn test_wishlist_and_production_tracker() {
    let app = app();
    let admin = app.admin().await;
    let product = app.product(&admin, 0).await;
    let (_, token) = app.customer("asha@example.com").await;

    app.server
        .post("/wishlist")
        .authorization_bearer(&token)
        .json(&json!({ "product_id": product }))
        .await
        .assert_status(StatusCode::CREATED);
    app.server
        .post("/wishlist")
        .authorization_bearer(&token)
        .json(&json!({ "product_id": product }))
        .await
        .assert_status(StatusCode::CONFLICT);
    let list = app
        .server
        .get("/wishlist")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert_eq!(list[0]["product"]["name"], "Brass Lamp");

    app.server
        .post(&format!("/admin/products/{}/production", product))
        .authorization_bearer(&admin)
        .await
        .assert_status(StatusCode::CREATED);
    let updated = app
        .server
        .put(&format!("/admin/products/{}/production/status", product))
        .authorization_bearer(&admin)
        .json(&json!({ "status": "completed" }))
        .await;
    updated.assert_status_ok();
    assert!(updated.json::<Value>()["completed_at"].is_string());

    let tracker = app
        .server
        .get("/admin/products/production")
        .authorization_bearer(&admin)
        .await
        .json::<Value>();
    assert_eq!(tracker.as_array().unwrap().len(), 1);

    app.server
        .delete(&format!("/admin/products/{}", product))
        .authorization_bearer(&admin)
        .await
        .assert_status_ok();
    app.server
        .get(&format!("/products/{}", product))
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let list = app
        .server
        .get("/wishlist")
        .authorization_bearer(&token)
        .await
        .json::<Value>();
    assert!(list.as_array().unwrap().is_empty());
}
