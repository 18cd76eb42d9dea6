//! Role inspection commands.
//!
//! # Usage
//!
//! ```bash
//! hm-cli role resolve u-8f2c
//! ```

use std::sync::Arc;

use heritage_core::{Role, UserId, resolve_role};
use heritage_storefront::config::DocumentStoreConfig;
use heritage_storefront::roles::RoleDirectory;
use heritage_storefront::store::DocumentStore;
use serde_json::{Value, json};

use super::{CommandError, print_json};

/// The stored record and resolved role for `uid`.
///
/// Unlike the storefront, a failed read is an error here rather than a
/// customer fallback.
///
/// # Errors
///
/// Returns `CommandError::Store` if the store read fails.
pub async fn inspect(
    store: Arc<dyn DocumentStore>,
    config: &DocumentStoreConfig,
    uid: &str,
) -> Result<Value, CommandError> {
    let directory = RoleDirectory::new(store, &config.users_collection);
    let uid = UserId::new(uid);
    let record = directory.lookup(&uid).await?;
    let role: Role = resolve_role(record.as_ref());

    Ok(json!({
        "uid": uid.as_str(),
        "recordFound": record.is_some(),
        "storedRole": record.and_then(|r| r.role),
        "role": role,
    }))
}

/// Print the resolved role for `uid`.
///
/// # Errors
///
/// Returns `CommandError` if the store read or output fails.
pub async fn resolve(
    store: Arc<dyn DocumentStore>,
    config: &DocumentStoreConfig,
    uid: &str,
) -> Result<(), CommandError> {
    let report = inspect(store, config, uid).await?;
    print_json(&report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use heritage_storefront::store::MemoryStore;

    use super::*;

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(
            MemoryStore::from_seed(&json!({
                "users": [
                    {"id": "u-admin", "role": "admin"},
                    {"id": "u-odd", "role": "superuser"}
                ]
            }))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn test_admin_record() {
        let report = inspect(store(), &DocumentStoreConfig::memory(), "u-admin")
            .await
            .unwrap();
        assert_eq!(report["role"], "admin");
        assert_eq!(report["recordFound"], true);
    }

    #[tokio::test]
    async fn test_missing_record_is_customer() {
        let report = inspect(store(), &DocumentStoreConfig::memory(), "u-new")
            .await
            .unwrap();
        assert_eq!(report["role"], "customer");
        assert_eq!(report["storedRole"], Value::Null);
    }

    #[tokio::test]
    async fn test_unknown_stored_role_is_customer() {
        let report = inspect(store(), &DocumentStoreConfig::memory(), "u-odd")
            .await
            .unwrap();
        assert_eq!(report["role"], "customer");
        assert_eq!(report["storedRole"], "superuser");
    }
}
