//! Integration test harness for Heritage Market.
//!
//! Builds the full storefront [`Router`] over a seeded [`MemoryStore`] and
//! the development identity verifier, where an ID token is simply the uid.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p heritage-integration-tests
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header},
};
use heritage_storefront::config::{
    DEFAULT_IDENTITY_ENDPOINT, DocumentStoreConfig, IdentityBackend, IdentityConfig,
    SentryConfig, StorefrontConfig,
};
use heritage_storefront::middleware::session::SESSION_COOKIE_NAME;
use heritage_storefront::routes;
use heritage_storefront::services::auth::DevIdentityVerifier;
use heritage_storefront::state::AppState;
use heritage_storefront::store::MemoryStore;
use serde_json::{Value, json};
use tower::ServiceExt;

/// Catalog and role records every test starts from.
#[must_use]
pub fn seed() -> Value {
    json!({
        "products": [
            {
                "id": "p-aso-oke",
                "name": "Aso Oke Gele",
                "culture": "Yoruba",
                "occasions": ["wedding", "naming"],
                "price": 85
            },
            {
                "id": "p-kente",
                "name": "Kente Stole",
                "culture": "Akan",
                "occasions": ["graduation"],
                "price": 45.5
            },
            {
                "id": "p-isicholo",
                "name": "Isicholo Hat",
                "culture": "Zulu",
                "occasions": ["wedding"]
            }
        ],
        "users": [
            {"id": "u-admin", "role": "admin"},
            {"id": "u-customer", "role": "customer"}
        ]
    })
}

/// A storefront wired to an in-memory store.
pub struct TestContext {
    pub app: Router,
    pub store: MemoryStore,
}

impl TestContext {
    /// Storefront over [`seed`] with a generous role settle timeout.
    ///
    /// # Panics
    ///
    /// Panics if the seed is malformed.
    #[must_use]
    pub fn new() -> Self {
        Self::with_settle_timeout(Duration::from_secs(2))
    }

    /// Storefront over [`seed`] waiting at most `timeout` for roles to settle.
    ///
    /// # Panics
    ///
    /// Panics if the seed is malformed.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn with_settle_timeout(timeout: Duration) -> Self {
        let store = MemoryStore::from_seed(&seed()).expect("seed is valid");
        let state = AppState::new(
            config(timeout),
            Arc::new(store.clone()),
            Arc::new(DevIdentityVerifier),
        );

        Self {
            app: routes::app(state),
            store,
        }
    }

    /// Send `request` through the router.
    ///
    /// # Panics
    ///
    /// Panics if the router fails, which it never does for valid requests.
    #[allow(clippy::expect_used)]
    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.app
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible")
    }

    /// GET `path`, optionally with a session cookie.
    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Response<Body> {
        self.send(get_request(path, cookie)).await
    }

    /// Sign in as `uid` and return the session cookie (`name=value`).
    ///
    /// # Panics
    ///
    /// Panics if sign-in does not set a session cookie.
    #[allow(clippy::expect_used)]
    pub async fn sign_in(&self, uid: &str) -> String {
        let request = Request::post("/auth/session")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!("id_token={uid}")))
            .expect("valid request");
        let response = self.send(request).await;
        session_cookie(&response).expect("sign-in sets a session cookie")
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Storefront configuration for tests.
#[must_use]
pub fn config(role_settle_timeout: Duration) -> StorefrontConfig {
    StorefrontConfig {
        host: IpAddr::V4(Ipv4Addr::LOCALHOST),
        port: 0,
        base_url: "http://localhost:3000".to_string(),
        store: DocumentStoreConfig::memory(),
        identity: IdentityConfig {
            backend: IdentityBackend::Dev,
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            api_key: None,
        },
        role_settle_timeout,
        sentry: SentryConfig::default(),
    }
}

/// Build a GET request, optionally with a session cookie.
///
/// # Panics
///
/// Panics if `path` is not a valid URI.
#[must_use]
#[allow(clippy::expect_used)]
pub fn get_request(path: &str, cookie: Option<&str>) -> Request<Body> {
    let mut builder = Request::get(path);
    if let Some(cookie) = cookie {
        builder = builder.header(header::COOKIE, cookie);
    }
    builder.body(Body::empty()).expect("valid request")
}

/// The session cookie set by `response`, as `name=value`.
#[must_use]
pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .filter_map(|value| value.split(';').next())
        .find(|pair| pair.starts_with(&format!("{SESSION_COOKIE_NAME}=")))
        .map(String::from)
}

/// The `Location` header of a redirect.
#[must_use]
pub fn location(response: &Response<Body>) -> Option<&str> {
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|value| value.to_str().ok())
}

/// Read a response body as text.
///
/// # Panics
///
/// Panics if the body cannot be read or is not UTF-8.
#[allow(clippy::expect_used)]
pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("readable body");
    String::from_utf8(bytes.to_vec()).expect("utf-8 body")
}

/// Read a response body as JSON.
///
/// # Panics
///
/// Panics if the body is not JSON.
#[allow(clippy::expect_used)]
pub async fn body_json(response: Response<Body>) -> Value {
    serde_json::from_str(&body_text(response).await).expect("JSON body")
}
