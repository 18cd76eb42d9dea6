//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. Request ID (`x-request-id`, set then propagated)
//! 3. `TraceLayer` (request tracing)
//! 4. Security headers (CSP, frame and referrer policy)
//! 5. Session layer (tower-sessions, in-memory store)
//! 6. Role guard (route layer on gated routes only)

pub mod guard;
pub mod identity;
pub mod security_headers;
pub mod session;

pub use guard::{
    GuardOutcome, HOME_ROUTE, LOGIN_ROUTE, guard, redirect_for, require_admin, require_customer,
};
pub use identity::{
    CurrentRole, OptionalIdentity, clear_current_identity, current_identity, set_current_identity,
};
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
