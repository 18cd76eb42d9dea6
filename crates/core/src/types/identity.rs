//! Authenticated identities reported by the identity provider.

use serde::{Deserialize, Serialize};

use crate::UserId;

/// A signed-in principal.
///
/// Minimal data kept in the session to identify the viewer. The `uid` keys the
/// viewer's role record in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// Provider-assigned unique identifier.
    pub uid: UserId,
    /// Email address, when the provider shares it.
    pub email: Option<String>,
}

impl Identity {
    /// Create an identity with no email.
    #[must_use]
    pub fn new(uid: impl Into<UserId>) -> Self {
        Self {
            uid: uid.into(),
            email: None,
        }
    }

    /// Attach an email address.
    #[must_use]
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}
