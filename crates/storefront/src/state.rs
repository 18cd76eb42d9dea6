//! Application state shared across handlers.

use std::sync::Arc;
use std::time::Duration;

use crate::catalog::Catalog;
use crate::config::StorefrontConfig;
use crate::middleware::session::SESSION_EXPIRY_SECONDS;
use crate::roles::{RoleDirectory, SessionRoles};
use crate::services::auth::IdentityVerifier;
use crate::store::DocumentStore;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to the
/// catalog, per-session role resolvers, and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    catalog: Catalog,
    roles: SessionRoles,
    identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    /// Create a new application state.
    ///
    /// # Arguments
    ///
    /// * `config` - Storefront configuration
    /// * `store` - Document store holding products and role records
    /// * `identity` - Verifier for provider ID tokens
    #[must_use]
    pub fn new(
        config: StorefrontConfig,
        store: Arc<dyn DocumentStore>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        let catalog = Catalog::new(Arc::clone(&store), &config.store.products_collection);
        let directory = RoleDirectory::new(store, &config.store.users_collection);
        let idle = Duration::from_secs(SESSION_EXPIRY_SECONDS.unsigned_abs());
        let roles = SessionRoles::new(directory, idle);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                catalog,
                roles,
                identity,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the product catalog.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        &self.inner.catalog
    }

    /// Get a reference to the per-session role resolvers.
    #[must_use]
    pub fn roles(&self) -> &SessionRoles {
        &self.inner.roles
    }

    /// Get a reference to the identity verifier.
    #[must_use]
    pub fn identity(&self) -> &dyn IdentityVerifier {
        self.inner.identity.as_ref()
    }
}
