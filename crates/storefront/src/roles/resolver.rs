//! Per-viewer role resolution with cancel-and-restart.
//!
//! Every identity change or refresh starts a new cycle with a fresh generation number.
//! Starting a cycle aborts the previous cycle's read, and a read that still
//! completes only publishes if its generation is current, so a slow lookup
//! for an old identity can never overwrite the state of a newer one.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use heritage_core::Identity;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::{RoleDirectory, RoleState};

/// Resolves and publishes the [`RoleState`] for one viewer.
///
/// Cheaply cloneable; clones share the same state. The in-flight read is
/// aborted when the last clone is dropped.
#[derive(Clone)]
pub struct RoleResolver {
    inner: Arc<ResolverInner>,
}

struct ResolverInner {
    directory: RoleDirectory,
    state: watch::Sender<RoleState>,
    cycle: Mutex<Cycle>,
}

#[derive(Default)]
struct Cycle {
    generation: u64,
    identity: Option<Identity>,
    task: Option<JoinHandle<()>>,
}

impl RoleResolver {
    /// Create a resolver in the unresolved state.
    #[must_use]
    pub fn new(directory: RoleDirectory) -> Self {
        let (state, _) = watch::channel(RoleState::unresolved());
        Self {
            inner: Arc::new(ResolverInner {
                directory,
                state,
                cycle: Mutex::new(Cycle::default()),
            }),
        }
    }

    /// Start a new resolution cycle for `identity`.
    ///
    /// With no identity the state settles to guest immediately. Otherwise the
    /// state goes to loading and the role record is read in the background.
    /// Must be called from within a tokio runtime.
    pub fn set_identity(&self, identity: Option<Identity>) {
        let mut cycle = self.inner.lock_cycle();
        cycle.generation = cycle.generation.wrapping_add(1);
        let generation = cycle.generation;

        if let Some(task) = cycle.task.take() {
            task.abort();
        }
        cycle.identity.clone_from(&identity);

        let Some(identity) = identity else {
            self.inner.state.send_replace(RoleState::anonymous());
            return;
        };

        self.inner.state.send_replace(RoleState::resolving());

        let directory = self.inner.directory.clone();
        let resolver = Arc::downgrade(&self.inner);
        cycle.task = Some(tokio::spawn(async move {
            let role = directory.resolve(Some(&identity)).await;
            publish(&resolver, generation, RoleState::resolved(role, true));
        }));
    }

    /// Start a fresh cycle for `identity` unless one is already reading it.
    ///
    /// A settled state is always re-read, so a changed role record shows up
    /// on the next request. Overlapping requests for the same identity join
    /// the read in flight instead of aborting it.
    pub fn refresh(&self, identity: Option<&Identity>) {
        let in_flight = {
            let cycle = self.inner.lock_cycle();
            cycle.generation > 0
                && cycle.identity.as_ref() == identity
                && self.inner.state.borrow().loading
        };
        if !in_flight {
            self.set_identity(identity.cloned());
        }
    }

    /// The identity of the current cycle.
    #[must_use]
    pub fn identity(&self) -> Option<Identity> {
        self.inner.lock_cycle().identity.clone()
    }

    /// The current published state.
    #[must_use]
    pub fn state(&self) -> RoleState {
        *self.inner.state.borrow()
    }

    /// Subscribe to state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<RoleState> {
        self.inner.state.subscribe()
    }

    /// Wait up to `timeout` for the state to stop loading.
    ///
    /// Returns whatever is published at that point, which may still be loading.
    pub async fn settled(&self, timeout: Duration) -> RoleState {
        let mut receiver = self.subscribe();
        let settled = tokio::time::timeout(timeout, receiver.wait_for(|state| !state.loading))
            .await
            .ok()
            .and_then(Result::ok)
            .map(|state| *state);
        settled.unwrap_or_else(|| self.state())
    }
}

impl ResolverInner {
    fn lock_cycle(&self) -> MutexGuard<'_, Cycle> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for ResolverInner {
    fn drop(&mut self) {
        let cycle = self.cycle.get_mut().unwrap_or_else(PoisonError::into_inner);
        if let Some(task) = cycle.task.take() {
            task.abort();
        }
    }
}

/// Publish a finished read if its cycle is still current.
fn publish(resolver: &Weak<ResolverInner>, generation: u64, state: RoleState) {
    let Some(inner) = resolver.upgrade() else {
        return;
    };

    let mut cycle = inner.lock_cycle();
    if cycle.generation != generation {
        tracing::debug!(
            generation,
            current = cycle.generation,
            "Discarding superseded role resolution"
        );
        return;
    }

    cycle.task = None;
    inner.state.send_replace(state);
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use heritage_core::Role;
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    const SETTLE: Duration = Duration::from_secs(2);

    fn users() -> MemoryStore {
        MemoryStore::from_seed(&json!({
            "users": [
                {"id": "u-admin", "role": "admin"},
                {"id": "u-customer", "role": "customer"}
            ]
        }))
        .unwrap()
    }

    fn resolver(store: &MemoryStore) -> RoleResolver {
        RoleResolver::new(RoleDirectory::new(Arc::new(store.clone()), "users"))
    }

    #[tokio::test]
    async fn test_starts_unresolved() {
        let store = users();
        let resolver = resolver(&store);
        assert_eq!(resolver.state(), RoleState::unresolved());
    }

    #[tokio::test]
    async fn test_no_identity_settles_to_guest_immediately() {
        let store = users();
        let resolver = resolver(&store);
        resolver.set_identity(None);

        let state = resolver.state();
        assert!(!state.loading);
        assert!(state.is_guest());
        assert!(!state.is_authenticated());
    }

    #[tokio::test]
    async fn test_admin_record_resolves_to_admin() {
        let store = users();
        let resolver = resolver(&store);
        resolver.set_identity(Some(Identity::new("u-admin")));

        let state = resolver.settled(SETTLE).await;
        assert_eq!(state, RoleState::resolved(Role::Admin, true));
    }

    #[tokio::test]
    async fn test_missing_record_resolves_to_customer() {
        let store = users();
        let resolver = resolver(&store);
        resolver.set_identity(Some(Identity::new("u-new")));

        let state = resolver.settled(SETTLE).await;
        assert_eq!(state, RoleState::resolved(Role::Customer, true));
    }

    #[tokio::test]
    async fn test_read_failure_resolves_to_customer() {
        let store = users();
        store.set_offline(true);
        let resolver = resolver(&store);
        resolver.set_identity(Some(Identity::new("u-admin")));

        let state = resolver.settled(SETTLE).await;
        assert_eq!(state.role, Role::Customer);
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn test_loading_while_read_outstanding() {
        let store = users();
        store
            .delay_document("users", "u-admin", Duration::from_millis(300))
            .await;
        let resolver = resolver(&store);
        resolver.set_identity(Some(Identity::new("u-admin")));

        let state = resolver.settled(Duration::from_millis(20)).await;
        assert!(state.loading);
        assert!(state.is_authenticated());
        assert!(state.is_guest());

        let state = resolver.settled(SETTLE).await;
        assert_eq!(state.role, Role::Admin);
    }

    #[tokio::test]
    async fn test_stale_resolution_never_overwrites_newer_identity() {
        let store = users();
        store
            .delay_document("users", "u-admin", Duration::from_millis(200))
            .await;
        let resolver = resolver(&store);

        resolver.set_identity(Some(Identity::new("u-admin")));
        resolver.set_identity(Some(Identity::new("u-customer")));

        let state = resolver.settled(SETTLE).await;
        assert_eq!(state.role, Role::Customer);

        // Outlive the slow admin read and check nothing changed
        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(resolver.state(), RoleState::resolved(Role::Customer, true));
    }

    #[tokio::test]
    async fn test_sign_out_during_resolution_stays_guest() {
        let store = users();
        store
            .delay_document("users", "u-admin", Duration::from_millis(100))
            .await;
        let resolver = resolver(&store);

        resolver.set_identity(Some(Identity::new("u-admin")));
        resolver.set_identity(None);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(resolver.state(), RoleState::anonymous());
    }

    #[tokio::test]
    async fn test_superseded_publish_is_ignored() {
        let store = users();
        let resolver = resolver(&store);
        resolver.set_identity(Some(Identity::new("u-customer")));
        let settled = resolver.settled(SETTLE).await;

        publish(
            &Arc::downgrade(&resolver.inner),
            0,
            RoleState::resolved(Role::Admin, true),
        );
        assert_eq!(resolver.state(), settled);
    }

    #[tokio::test]
    async fn test_refresh_rereads_settled_role() {
        let store = users();
        let resolver = resolver(&store);
        let identity = Identity::new("u-admin");

        resolver.refresh(Some(&identity));
        assert!(resolver.settled(SETTLE).await.is_admin());

        let mut demoted = serde_json::Map::new();
        demoted.insert("role".to_string(), json!("customer"));
        store.insert("users", "u-admin", demoted).await;

        resolver.refresh(Some(&identity));
        let state = resolver.settled(SETTLE).await;
        assert_eq!(state, RoleState::resolved(Role::Customer, true));
    }

    #[tokio::test]
    async fn test_refresh_recovers_from_failed_read() {
        let store = users();
        store.set_offline(true);
        let resolver = resolver(&store);
        let identity = Identity::new("u-admin");

        resolver.refresh(Some(&identity));
        assert_eq!(resolver.settled(SETTLE).await.role, Role::Customer);

        store.set_offline(false);
        resolver.refresh(Some(&identity));
        assert!(resolver.settled(SETTLE).await.is_admin());
    }

    #[tokio::test]
    async fn test_refresh_joins_read_in_flight() {
        let store = users();
        store
            .delay_document("users", "u-admin", Duration::from_millis(200))
            .await;
        let resolver = resolver(&store);
        let identity = Identity::new("u-admin");

        resolver.refresh(Some(&identity));
        let generation = resolver.inner.lock_cycle().generation;
        resolver.refresh(Some(&identity));
        assert_eq!(resolver.inner.lock_cycle().generation, generation);

        resolver.refresh(None);
        assert_eq!(resolver.inner.lock_cycle().generation, generation + 1);
        assert_eq!(resolver.identity(), None);
        assert_eq!(resolver.state(), RoleState::anonymous());
    }

    #[tokio::test]
    async fn test_refresh_starts_fresh_resolver() {
        let store = users();
        let resolver = resolver(&store);
        resolver.refresh(None);
        assert_eq!(resolver.state(), RoleState::anonymous());
    }

    #[tokio::test]
    async fn test_subscribers_see_settled_state() {
        let store = users();
        let resolver = resolver(&store);
        let mut receiver = resolver.subscribe();

        resolver.set_identity(Some(Identity::new("u-admin")));
        let state = *receiver.wait_for(|s| !s.loading).await.unwrap();
        assert!(state.is_admin());
    }
}
