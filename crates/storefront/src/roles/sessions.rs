//! One role resolver per browser session.
//!
//! Resolvers live in a `moka` cache keyed by session id and are evicted once
//! the session has been idle as long as the session cookie lives. Eviction
//! drops the resolver, which aborts any read still in flight.
//!
//! The cache holds the resolver, not the role: every request re-reads the
//! role record, joining a read that another request already started.

use std::time::Duration;

use heritage_core::Identity;
use moka::future::Cache;

use super::{RoleDirectory, RoleResolver, RoleState};

/// Upper bound on concurrently tracked sessions.
const MAX_SESSIONS: u64 = 10_000;

/// Session-scoped role resolvers.
#[derive(Clone)]
pub struct SessionRoles {
    directory: RoleDirectory,
    resolvers: Cache<String, RoleResolver>,
}

impl SessionRoles {
    /// Create an empty registry whose resolvers expire after `idle`.
    #[must_use]
    pub fn new(directory: RoleDirectory, idle: Duration) -> Self {
        let resolvers = Cache::builder()
            .max_capacity(MAX_SESSIONS)
            .time_to_idle(idle)
            .build();

        Self {
            directory,
            resolvers,
        }
    }

    /// The session's resolver, refreshed for `identity`.
    ///
    /// Starts a fresh resolution cycle unless one for the same identity is
    /// still reading, so a changed role record is seen by the next request.
    pub async fn resolver(&self, session_key: &str, identity: Option<&Identity>) -> RoleResolver {
        let resolver = self
            .resolvers
            .get_with_by_ref(session_key, async {
                RoleResolver::new(self.directory.clone())
            })
            .await;
        resolver.refresh(identity);
        resolver
    }

    /// Restart the session's resolution for a new identity (sign-in, sign-out).
    pub async fn identity_changed(&self, session_key: &str, identity: Option<Identity>) {
        let resolver = self
            .resolvers
            .get_with_by_ref(session_key, async {
                RoleResolver::new(self.directory.clone())
            })
            .await;
        resolver.set_identity(identity);
    }

    /// Role state for a request, waiting up to `timeout` for it to settle.
    ///
    /// Requests without a session id and without an identity are guests
    /// without touching the registry.
    pub async fn state_for(
        &self,
        session_key: Option<&str>,
        identity: Option<&Identity>,
        timeout: Duration,
    ) -> RoleState {
        match (session_key, identity) {
            (None, None) => RoleState::anonymous(),
            (Some(key), identity) => self.resolver(key, identity).await.settled(timeout).await,
            (None, Some(identity)) => {
                let resolver = RoleResolver::new(self.directory.clone());
                resolver.set_identity(Some(identity.clone()));
                resolver.settled(timeout).await
            }
        }
    }

    /// Drop the session's resolver.
    pub async fn forget(&self, session_key: &str) {
        self.resolvers.invalidate(session_key).await;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use heritage_core::Role;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    const SETTLE: Duration = Duration::from_secs(2);

    fn roles() -> SessionRoles {
        let store = MemoryStore::from_seed(&json!({
            "users": [{"id": "u-admin", "role": "admin"}]
        }))
        .unwrap();
        SessionRoles::new(
            RoleDirectory::new(Arc::new(store), "users"),
            Duration::from_secs(60),
        )
    }

    #[tokio::test]
    async fn test_anonymous_request_is_guest() {
        let state = roles().state_for(None, None, SETTLE).await;
        assert_eq!(state, RoleState::anonymous());
    }

    #[tokio::test]
    async fn test_session_resolver_is_reused() {
        let roles = roles();
        let identity = Identity::new("u-admin");

        let first = roles.resolver("s1", Some(&identity)).await;
        first.settled(SETTLE).await;
        let second = roles.resolver("s1", Some(&identity)).await;

        assert_eq!(second.identity(), Some(identity));
        assert_eq!(
            second.settled(SETTLE).await,
            RoleState::resolved(Role::Admin, true)
        );
        assert_eq!(first.state(), second.state());
    }

    #[tokio::test]
    async fn test_each_request_rereads_role() {
        let store = MemoryStore::from_seed(&json!({
            "users": [{"id": "u-admin", "role": "admin"}]
        }))
        .unwrap();
        let roles = SessionRoles::new(
            RoleDirectory::new(Arc::new(store.clone()), "users"),
            Duration::from_secs(60),
        );
        let identity = Identity::new("u-admin");

        let state = roles.state_for(Some("s1"), Some(&identity), SETTLE).await;
        assert!(state.is_admin());

        let mut demoted = serde_json::Map::new();
        demoted.insert("role".to_string(), json!("customer"));
        store.insert("users", "u-admin", demoted).await;

        let state = roles.state_for(Some("s1"), Some(&identity), SETTLE).await;
        assert_eq!(state, RoleState::resolved(Role::Customer, true));
    }

    #[tokio::test]
    async fn test_sessions_are_independent() {
        let roles = roles();
        let admin = Identity::new("u-admin");

        let admin_state = roles.state_for(Some("s1"), Some(&admin), SETTLE).await;
        let guest_state = roles.state_for(Some("s2"), None, SETTLE).await;

        assert!(admin_state.is_admin());
        assert!(guest_state.is_guest());
        assert!(!guest_state.loading);
    }

    #[tokio::test]
    async fn test_identity_changed_restarts_resolution() {
        let roles = roles();
        let admin = Identity::new("u-admin");
        roles.state_for(Some("s1"), Some(&admin), SETTLE).await;

        roles.identity_changed("s1", None).await;
        let state = roles.state_for(Some("s1"), None, SETTLE).await;
        assert_eq!(state, RoleState::anonymous());
    }

    #[tokio::test]
    async fn test_identity_without_session_still_resolves() {
        let roles = roles();
        let identity = Identity::new("u-someone");
        let state = roles.state_for(None, Some(&identity), SETTLE).await;
        assert_eq!(state, RoleState::resolved(Role::Customer, true));
    }

    #[tokio::test]
    async fn test_forget_drops_resolver() {
        let roles = roles();
        let admin = Identity::new("u-admin");
        roles.state_for(Some("s1"), Some(&admin), SETTLE).await;
        roles.forget("s1").await;

        let fresh = roles.resolver("s1", None).await;
        assert_eq!(fresh.identity(), None);
    }
}
