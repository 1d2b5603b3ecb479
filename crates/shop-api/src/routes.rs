//! # Routes
//!
//! Axum router configuration. Routes are grouped by guard: public, bearer
//! authenticated, and admin.

use crate::handlers::{auth, cart, health, orders, payments, products, users, webhook, wishlist};
use crate::middleware::{require_admin, require_auth};
use crate::state::AppState;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Create the main application router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let auth_routes = Router::new()
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/refresh", post(auth::refresh))
        .route("/logout", post(auth::logout))
        .route("/send-otp", post(auth::send_otp))
        .route("/resend-otp", post(auth::resend_otp))
        .route("/verify-otp", post(auth::verify_otp))
        .route("/forgot-password", post(auth::forgot_password))
        .route("/reset-password", post(auth::reset_password));

    let public_routes = Router::new()
        .route("/health", get(health::health))
        .route("/products", get(products::list))
        .route("/products/{id}", get(products::get))
        // Webhooks authenticate by signature, not bearer token
        .route("/webhook/stripe", post(webhook::stripe))
        .nest("/auth", auth_routes);

    let user_routes = Router::new()
        .route(
            "/user/profile",
            get(users::profile).put(users::update_profile),
        )
        .route("/cart", get(cart::view).post(cart::add))
        .route("/cart/{item_id}", put(cart::update).delete(cart::remove))
        .route("/wishlist", get(wishlist::list).post(wishlist::add))
        .route("/wishlist/{product_id}", delete(wishlist::remove))
        .route("/order", post(orders::place).get(orders::list_mine))
        .route("/order/{id}", get(orders::get).delete(orders::delete))
        .route("/payments/create", post(payments::create))
        .route("/payments/{payment_id}/update", put(payments::update))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    let admin_routes = Router::new()
        .route("/products", post(products::create))
        .route("/products/production", get(products::productions))
        .route(
            "/products/{id}",
            put(products::update).delete(products::delete),
        )
        .route(
            "/products/{id}/production",
            post(products::start_production).get(products::production),
        )
        .route(
            "/products/{id}/production/status",
            put(products::update_production_status),
        )
        .route("/orders", get(orders::list_all))
        .route("/orders/{id}", put(orders::update_status))
        .route("/users", get(users::list))
        .route("/users/{id}", put(users::admin_update))
        .route("/users/{id}/block", post(users::block))
        .route("/users/{id}/unblock", post(users::unblock))
        // Last layer runs first: identity, then role
        .route_layer(from_fn(require_admin))
        .route_layer(from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(user_routes)
        .nest("/admin", admin_routes)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
        .with_state(state)
}
