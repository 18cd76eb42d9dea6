//! Authentication route handlers.
//!
//! The identity provider signs the viewer in on the client and hands the
//! storefront an ID token. `POST /auth/session` verifies it, stores the
//! identity in the session, and restarts the session's role resolution.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;

use crate::error::{clear_sentry_user, set_sentry_user};
use crate::filters;
use crate::middleware::{OptionalIdentity, clear_current_identity, set_current_identity};
use crate::services::auth::AuthError;
use crate::state::AppState;

/// Where a fresh sign-in lands.
const AFTER_LOGIN_ROUTE: &str = "/account";

// =============================================================================
// Form Types
// =============================================================================

/// Sign-in form data.
#[derive(Debug, Deserialize)]
pub struct SessionForm {
    pub id_token: String,
}

/// Query parameters for error display.
#[derive(Debug, Deserialize)]
pub struct MessageQuery {
    pub error: Option<String>,
}

// =============================================================================
// Templates
// =============================================================================

/// Login page template.
#[derive(Template, WebTemplate)]
#[template(path = "auth/login.html")]
pub struct LoginTemplate {
    pub error: Option<String>,
    pub signed_in_as: Option<String>,
}

// =============================================================================
// Routes
// =============================================================================

/// Display the login page.
pub async fn login_page(
    Query(query): Query<MessageQuery>,
    OptionalIdentity(identity): OptionalIdentity,
) -> impl IntoResponse {
    LoginTemplate {
        error: query.error.as_deref().map(error_message),
        signed_in_as: identity.map(|i| i.email.unwrap_or_else(|| i.uid.to_string())),
    }
}

/// Establish the session identity from a provider ID token.
pub async fn create_session(
    State(state): State<AppState>,
    session: Session,
    Form(form): Form<SessionForm>,
) -> Response {
    let token = form.id_token.trim();
    if token.is_empty() {
        return Redirect::to("/auth/login?error=missing_token").into_response();
    }

    let identity = match state.identity().verify(token).await {
        Ok(identity) => identity,
        Err(AuthError::InvalidToken) => {
            tracing::warn!("Sign-in with invalid ID token");
            return Redirect::to("/auth/login?error=invalid_token").into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "Identity verification failed");
            return Redirect::to("/auth/login?error=provider").into_response();
        }
    };

    // New session id on sign-in; the old id's resolver goes with it
    if let Some(old) = session.id() {
        state.roles().forget(&old.to_string()).await;
    }
    if let Err(e) = session.cycle_id().await {
        tracing::error!(error = %e, "Failed to cycle session id");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    if let Err(e) = set_current_identity(&session, &identity).await {
        tracing::error!(error = %e, "Failed to set session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    // Persist now so the session has an id to key its resolver on
    if let Err(e) = session.save().await {
        tracing::error!(error = %e, "Failed to save session");
        return Redirect::to("/auth/login?error=session").into_response();
    }

    if let Some(id) = session.id() {
        state
            .roles()
            .identity_changed(&id.to_string(), Some(identity.clone()))
            .await;
    }

    set_sentry_user(&identity.uid, identity.email.as_deref());
    tracing::info!(uid = %identity.uid, "Signed in");

    Redirect::to(AFTER_LOGIN_ROUTE).into_response()
}

/// Handle logout.
///
/// Clears the identity, settles the session's role to guest, and destroys
/// the session.
pub async fn logout(State(state): State<AppState>, session: Session) -> Response {
    if let Err(e) = clear_current_identity(&session).await {
        tracing::error!("Failed to clear session: {}", e);
    }

    if let Some(id) = session.id() {
        let key = id.to_string();
        state.roles().identity_changed(&key, None).await;
        state.roles().forget(&key).await;
    }

    if let Err(e) = session.flush().await {
        tracing::error!("Failed to flush session: {}", e);
    }

    clear_sentry_user();

    Redirect::to("/").into_response()
}

/// User-facing text for a login error code.
fn error_message(code: &str) -> String {
    match code {
        "missing_token" => "Sign in with your identity provider first.",
        "invalid_token" => "That sign-in has expired. Please try again.",
        "provider" => "We couldn't reach the sign-in service. Please try again.",
        "session" => "We couldn't start your session. Please try again.",
        _ => "Something went wrong signing you in.",
    }
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        assert!(error_message("invalid_token").contains("expired"));
        assert_eq!(
            error_message("<script>"),
            "Something went wrong signing you in."
        );
    }
}
