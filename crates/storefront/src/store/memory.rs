//! In-process document store.
//!
//! Mirrors the query semantics of the hosted store: exact, case-sensitive
//! equality and array membership. Documents are returned in key order.
//! Used for local development (`STORE_BACKEND=memory`), the CLI's `--seed`
//! mode, and tests, which can also take it offline or slow down single
//! documents.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use super::{Document, DocumentStore, StoreError};

type Collection = BTreeMap<String, Map<String, Value>>;

/// In-memory [`DocumentStore`].
///
/// Cloning shares the underlying data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryStoreInner>,
}

#[derive(Default)]
struct MemoryStoreInner {
    collections: RwLock<HashMap<String, Collection>>,
    offline: AtomicBool,
    delays: RwLock<HashMap<(String, String), Duration>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from a seed document.
    ///
    /// The seed maps collection names to arrays of objects, each carrying a
    /// string `id`:
    ///
    /// ```json
    /// {
    ///   "products": [{"id": "p1", "culture": "zulu", "occasions": ["wedding"]}],
    ///   "users": [{"id": "uid-1", "role": "admin"}]
    /// }
    /// ```
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Decode` if the seed does not have that shape.
    pub fn from_seed(seed: &Value) -> Result<Self, StoreError> {
        let collections = seed
            .as_object()
            .ok_or_else(|| StoreError::Decode("seed must be a JSON object".to_string()))?;

        let mut data: HashMap<String, Collection> = HashMap::new();
        for (name, documents) in collections {
            let documents = documents.as_array().ok_or_else(|| {
                StoreError::Decode(format!("seed collection {name} must be an array"))
            })?;

            let collection = data.entry(name.clone()).or_default();
            for document in documents {
                let mut fields = document.as_object().cloned().ok_or_else(|| {
                    StoreError::Decode(format!("seed document in {name} must be an object"))
                })?;
                let id = match fields.remove("id") {
                    Some(Value::String(id)) if !id.is_empty() => id,
                    _ => {
                        return Err(StoreError::Decode(format!(
                            "seed document in {name} needs a string id"
                        )));
                    }
                };
                collection.insert(id, fields);
            }
        }

        Ok(Self {
            inner: Arc::new(MemoryStoreInner {
                collections: RwLock::new(data),
                ..MemoryStoreInner::default()
            }),
        })
    }

    /// Build a store from a JSON seed file. See [`MemoryStore::from_seed`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the file cannot be read or parsed.
    pub fn from_seed_file(path: &Path) -> Result<Self, StoreError> {
        let raw = std::fs::read_to_string(path)?;
        let seed: Value = serde_json::from_str(&raw)?;
        Self::from_seed(&seed)
    }

    /// Insert or replace a document.
    pub async fn insert(&self, collection: &str, id: &str, fields: Map<String, Value>) {
        self.inner
            .collections
            .write()
            .await
            .entry(collection.to_owned())
            .or_default()
            .insert(id.to_owned(), fields);
    }

    /// Make every subsequent read fail with `StoreError::Unavailable`.
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Delay reads of one document by `delay`.
    pub async fn delay_document(&self, collection: &str, id: &str, delay: Duration) {
        self.inner
            .delays
            .write()
            .await
            .insert((collection.to_owned(), id.to_owned()), delay);
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is offline".to_string()));
        }
        Ok(())
    }

    async fn select<F>(&self, collection: &str, keep: F) -> Result<Vec<Document>, StoreError>
    where
        F: Fn(&Map<String, Value>) -> bool + Send,
    {
        self.check_online()?;

        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|(_, fields)| keep(fields))
                    .map(|(id, fields)| Document::new(id.clone(), fields.clone()))
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError> {
        self.select(collection, |_| true).await
    }

    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        self.select(collection, |fields| {
            fields.get(field).and_then(Value::as_str) == Some(value)
        })
        .await
    }

    async fn find_array_contains(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError> {
        self.select(collection, |fields| {
            fields
                .get(field)
                .and_then(Value::as_array)
                .is_some_and(|items| items.iter().any(|item| item.as_str() == Some(value)))
        })
        .await
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        let delay = self
            .inner
            .delays
            .read()
            .await
            .get(&(collection.to_owned(), id.to_owned()))
            .copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_online()?;

        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|documents| documents.get(id))
            .map(|fields| Document::new(id, fields.clone())))
    }
}
