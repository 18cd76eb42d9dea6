//! Role-gated routes.
//!
//! The access decision is pure ([`guard`], [`redirect_for`]); the middleware
//! applies it. A request for a gated route waits briefly for the session's
//! role to settle, then either renders the loading placeholder, redirects, or
//! runs the wrapped handler with the request untouched.
//!
//! ```rust,ignore
//! Router::new()
//!     .route("/admin", get(admin::index))
//!     .route_layer(from_fn_with_state(state.clone(), require_admin))
//! ```

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    extract::{Request, State},
    http::{HeaderName, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use heritage_core::{Role, can_access};
use tower_sessions::Session;

use super::identity::role_state;
use crate::filters;
use crate::roles::RoleState;
use crate::state::AppState;

/// Where viewers without admin access are sent.
pub const HOME_ROUTE: &str = "/";

/// Where guests are sent from customer views.
pub const LOGIN_ROUTE: &str = "/auth/login";

/// Seconds before the loading placeholder asks the browser to retry.
const LOADING_REFRESH_SECONDS: &str = "1";

const REFRESH: HeaderName = HeaderName::from_static("refresh");

/// What a gated route should do for a viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Role still resolving: show the placeholder, do not navigate.
    Loading,
    /// Send the viewer elsewhere.
    Redirect(&'static str),
    /// Run the wrapped handler.
    Render,
}

/// Redirect target for `role` on a view requiring `required`, if any.
#[must_use]
pub const fn redirect_for(role: Role, required: Role) -> Option<&'static str> {
    if can_access(role, required) {
        return None;
    }
    match required {
        Role::Admin => Some(HOME_ROUTE),
        Role::Customer | Role::Guest => Some(LOGIN_ROUTE),
    }
}

/// Decide what a view requiring `required` does for `state`.
#[must_use]
pub const fn guard(state: &RoleState, required: Role) -> GuardOutcome {
    if state.loading {
        return GuardOutcome::Loading;
    }
    match redirect_for(state.role, required) {
        Some(path) => GuardOutcome::Redirect(path),
        None => GuardOutcome::Render,
    }
}

/// Placeholder shown while the viewer's role is resolving.
#[derive(Template, WebTemplate)]
#[template(path = "loading.html")]
pub struct LoadingTemplate {
    pub refresh_seconds: &'static str,
}

/// Gate a route on the customer role.
pub async fn require_customer(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    require_role(Role::Customer, &state, request, next).await
}

/// Gate a route on the admin role.
pub async fn require_admin(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    require_role(Role::Admin, &state, request, next).await
}

/// Gate a route on `required`.
///
/// The settled [`RoleState`] is added to the request extensions so handlers
/// extracting [`CurrentRole`](super::CurrentRole) see the same state.
pub async fn require_role(
    required: Role,
    state: &AppState,
    mut request: Request,
    next: Next,
) -> Response {
    let session = request.extensions().get::<Session>().cloned();
    let role = role_state(state, session.as_ref()).await;

    match guard(&role, required) {
        GuardOutcome::Loading => {
            tracing::debug!(path = %request.uri().path(), "Role still resolving");
            (
                [(REFRESH, HeaderValue::from_static(LOADING_REFRESH_SECONDS))],
                LoadingTemplate {
                    refresh_seconds: LOADING_REFRESH_SECONDS,
                },
            )
                .into_response()
        }
        GuardOutcome::Redirect(path) => {
            tracing::info!(
                path = %request.uri().path(),
                role = %role.role,
                required = %required,
                target = path,
                "Redirecting viewer without access"
            );
            Redirect::to(path).into_response()
        }
        GuardOutcome::Render => {
            request.extensions_mut().insert(role);
            next.run(request).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loading_never_redirects() {
        for required in [Role::Guest, Role::Customer, Role::Admin] {
            assert_eq!(
                guard(&RoleState::unresolved(), required),
                GuardOutcome::Loading
            );
            assert_eq!(guard(&RoleState::resolving(), required), GuardOutcome::Loading);
        }
    }

    #[test]
    fn test_customer_on_admin_view_goes_home() {
        let state = RoleState::resolved(Role::Customer, true);
        assert_eq!(
            guard(&state, Role::Admin),
            GuardOutcome::Redirect(HOME_ROUTE)
        );
    }

    #[test]
    fn test_guest_on_admin_view_goes_home() {
        assert_eq!(
            guard(&RoleState::anonymous(), Role::Admin),
            GuardOutcome::Redirect(HOME_ROUTE)
        );
    }

    #[test]
    fn test_guest_on_customer_view_goes_to_login() {
        assert_eq!(
            guard(&RoleState::anonymous(), Role::Customer),
            GuardOutcome::Redirect(LOGIN_ROUTE)
        );
    }

    #[test]
    fn test_admin_renders_customer_view() {
        let state = RoleState::resolved(Role::Admin, true);
        assert_eq!(guard(&state, Role::Customer), GuardOutcome::Render);
        assert_eq!(guard(&state, Role::Admin), GuardOutcome::Render);
    }

    #[test]
    fn test_guest_views_always_render() {
        assert_eq!(
            guard(&RoleState::anonymous(), Role::Guest),
            GuardOutcome::Render
        );
    }

    #[test]
    fn test_redirect_for() {
        assert_eq!(redirect_for(Role::Customer, Role::Customer), None);
        assert_eq!(redirect_for(Role::Guest, Role::Customer), Some(LOGIN_ROUTE));
        assert_eq!(redirect_for(Role::Customer, Role::Admin), Some(HOME_ROUTE));
        assert_eq!(redirect_for(Role::Admin, Role::Admin), None);
    }
}
