//! Session identity and role extractors.
//!
//! The signed-in [`Identity`] lives in the tower-sessions session. The role
//! for a request comes from the session's resolver in [`SessionRoles`].
//!
//! [`SessionRoles`]: crate::roles::SessionRoles

use axum::{extract::FromRequestParts, http::request::Parts};
use heritage_core::Identity;
use tower_sessions::Session;

use crate::roles::RoleState;
use crate::state::AppState;

/// Session key for the signed-in identity.
pub const CURRENT_IDENTITY: &str = "current_identity";

/// Extractor for the signed-in identity, if any.
///
/// Never rejects; a missing session or a corrupt entry reads as signed out.
pub struct OptionalIdentity(pub Option<Identity>);

impl<S> FromRequestParts<S> for OptionalIdentity
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let identity = match parts.extensions.get::<Session>() {
            Some(session) => current_identity(session).await,
            None => None,
        };

        Ok(Self(identity))
    }
}

/// Extractor for the request's role state.
///
/// Reuses the state computed by the role guard when the route has one,
/// otherwise waits up to the configured settle timeout for the session's
/// resolver.
pub struct CurrentRole(pub RoleState);

impl FromRequestParts<AppState> for CurrentRole {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(role) = parts.extensions.get::<RoleState>() {
            return Ok(Self(*role));
        }

        let session = parts.extensions.get::<Session>();
        Ok(Self(role_state(state, session).await))
    }
}

/// Resolve the role state for a request's session.
pub async fn role_state(state: &AppState, session: Option<&Session>) -> RoleState {
    let (key, identity) = match session {
        Some(session) => {
            // Loading first drops the id of a session the store no longer has
            let identity = current_identity(session).await;
            (session.id().map(|id| id.to_string()), identity)
        }
        None => (None, None),
    };

    state
        .roles()
        .state_for(
            key.as_deref(),
            identity.as_ref(),
            state.config().role_settle_timeout,
        )
        .await
}

/// Read the signed-in identity from the session.
pub async fn current_identity(session: &Session) -> Option<Identity> {
    match session.get::<Identity>(CURRENT_IDENTITY).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!(error = %e, "Unreadable identity in session");
            None
        }
    }
}

/// Store the signed-in identity in the session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_identity(
    session: &Session,
    identity: &Identity,
) -> Result<(), tower_sessions::session::Error> {
    session.insert(CURRENT_IDENTITY, identity).await
}

/// Remove the signed-in identity from the session (logout).
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_identity(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.remove::<Identity>(CURRENT_IDENTITY).await?;
    Ok(())
}
