//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /                       - Home page (featured products, culture and occasion links)
//! GET  /health                 - Liveness
//! GET  /health/ready           - Readiness (document store reachable)
//!
//! # Products
//! GET  /products               - Product listing
//! GET  /products/{id}          - Product detail (404 page when absent)
//! GET  /cultures/{culture}     - Products for a culture
//! GET  /occasions/{occasion}   - Products for an occasion
//!
//! # Auth
//! GET  /auth/login             - Login page
//! POST /auth/session           - Establish identity from a provider ID token
//! POST /auth/logout            - Logout action
//!
//! # Role-gated
//! GET  /account                - Requires customer (guests go to /auth/login)
//! GET  /admin                  - Requires admin (everyone else goes to /)
//!
//! # JSON API
//! GET  /api/role               - Role state for the current session
//! GET  /api/products           - Products (?culture= or ?occasion=)
//! GET  /api/products/{id}      - Single product
//! ```

pub mod account;
pub mod admin;
pub mod api;
pub mod auth;
pub mod health;
pub mod home;
pub mod products;

use axum::{
    Router,
    middleware::{from_fn, from_fn_with_state},
    response::Response,
    routing::{get, post},
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::middleware::{
    create_session_layer, require_admin, require_customer, security_headers_middleware,
};
use crate::state::AppState;

/// Create the product routes router.
pub fn product_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(products::index))
        .route("/{id}", get(products::show))
}

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/login", get(auth::login_page))
        .route("/session", post(auth::create_session))
        .route("/logout", post(auth::logout))
}

/// Create the JSON API routes router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/role", get(api::role))
        .route("/products", get(api::products))
        .route("/products/{id}", get(api::product))
}

/// Create the customer-gated routes router.
pub fn customer_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/account", get(account::index))
        .route_layer(from_fn_with_state(state.clone(), require_customer))
}

/// Create the admin-gated routes router.
pub fn admin_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/admin", get(admin::index))
        .route_layer(from_fn_with_state(state.clone(), require_admin))
}

/// Build the full storefront application.
///
/// Sentry layers are added by the binary so tests run without a hub.
pub fn app(state: AppState) -> Router {
    let session_layer = create_session_layer(state.config());

    Router::new()
        .route("/", get(home::index))
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .nest("/products", product_routes())
        .route("/cultures/{culture}", get(products::by_culture))
        .route("/occasions/{occasion}", get(products::by_occasion))
        .nest("/auth", auth_routes())
        .nest("/api", api_routes())
        .merge(customer_routes(&state))
        .merge(admin_routes(&state))
        .fallback(fallback)
        .layer(session_layer)
        .layer(from_fn(security_headers_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .with_state(state)
}

async fn fallback() -> Response {
    products::not_found("That page doesn't exist.")
}
