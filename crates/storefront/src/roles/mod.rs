//! Role resolution.
//!
//! Turns "who is signed in" into a [`Role`]:
//!
//! - [`RoleDirectory`] reads a uid's role record from the users collection
//! - [`RoleResolver`] owns the published [`RoleState`] for one viewer and
//!   re-resolves on every identity change or refresh, discarding superseded reads
//! - [`SessionRoles`] keeps one resolver per browser session
//!
//! # Policy
//!
//! | Identity | Record | Role |
//! |----------|--------|------|
//! | none | - | guest |
//! | present | `role` set | that role |
//! | present | missing, or `role` empty | customer |
//! | present | read failed | customer |

mod resolver;
mod sessions;

use std::sync::Arc;

use heritage_core::{Identity, Role, RoleRecord, UserId, resolve_role};
use serde::Serialize;
use tracing::instrument;

use crate::store::{DocumentStore, StoreError};

pub use resolver::RoleResolver;
pub use sessions::SessionRoles;

/// Reads role records from the users collection.
#[derive(Clone)]
pub struct RoleDirectory {
    store: Arc<dyn DocumentStore>,
    collection: Arc<str>,
}

impl RoleDirectory {
    /// Create a directory reading from `collection`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            store,
            collection: Arc::from(collection),
        }
    }

    /// The stored role record for `uid`, or `None` if there is none.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store read fails.
    #[instrument(skip(self, uid), fields(uid = %uid))]
    pub async fn lookup(&self, uid: &UserId) -> Result<Option<RoleRecord>, StoreError> {
        let document = self.store.get(&self.collection, uid.as_str()).await?;
        Ok(document.map(|d| RoleRecord::from_fields(&d.fields)))
    }

    /// Resolve the role for an identity (or its absence).
    ///
    /// Never fails: a failed read is logged and resolves to
    /// [`Role::Customer`], the lowest signed-in privilege.
    pub async fn resolve(&self, identity: Option<&Identity>) -> Role {
        let Some(identity) = identity else {
            return Role::Guest;
        };

        match self.lookup(&identity.uid).await {
            Ok(record) => resolve_role(record.as_ref()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    uid = %identity.uid,
                    "Role lookup failed, defaulting to customer"
                );
                Role::Customer
            }
        }
    }
}

/// Published role state for one viewer.
///
/// Serializes as `{role, loading, isGuest, isCustomer, isAdmin, isAuthenticated}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "RoleStateBody")]
pub struct RoleState {
    /// Current role. `Guest` until resolution settles.
    pub role: Role,
    /// Whether a resolution is still outstanding.
    pub loading: bool,
    /// Whether an identity is present.
    pub authenticated: bool,
}

impl RoleState {
    /// Initial state before anything is known.
    #[must_use]
    pub const fn unresolved() -> Self {
        Self {
            role: Role::Guest,
            loading: true,
            authenticated: false,
        }
    }

    /// An identity is present and its record is being read.
    #[must_use]
    pub const fn resolving() -> Self {
        Self {
            role: Role::Guest,
            loading: true,
            authenticated: true,
        }
    }

    /// Settled state for `role`.
    #[must_use]
    pub const fn resolved(role: Role, authenticated: bool) -> Self {
        Self {
            role,
            loading: false,
            authenticated,
        }
    }

    /// Settled state for a viewer with no identity.
    #[must_use]
    pub const fn anonymous() -> Self {
        Self::resolved(Role::Guest, false)
    }

    #[must_use]
    pub const fn is_guest(&self) -> bool {
        matches!(self.role, Role::Guest)
    }

    #[must_use]
    pub const fn is_customer(&self) -> bool {
        matches!(self.role, Role::Customer)
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self.role, Role::Admin)
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}

impl Default for RoleState {
    fn default() -> Self {
        Self::unresolved()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RoleStateBody {
    role: Role,
    loading: bool,
    is_guest: bool,
    is_customer: bool,
    is_admin: bool,
    is_authenticated: bool,
}

impl From<RoleState> for RoleStateBody {
    fn from(state: RoleState) -> Self {
        Self {
            role: state.role,
            loading: state.loading,
            is_guest: state.is_guest(),
            is_customer: state.is_customer(),
            is_admin: state.is_admin(),
            is_authenticated: state.is_authenticated(),
        }
    }
}
