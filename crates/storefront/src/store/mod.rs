//! Document store access.
//!
//! # Architecture
//!
//! - The hosted document database is the source of truth for products and
//!   user role records - NO local sync, direct reads on every request
//! - Every read goes through the [`DocumentStore`] port so the catalog and
//!   role resolution never depend on a particular backend
//! - This system never writes to the store
//!
//! # Backends
//!
//! - [`FirestoreClient`] - Firestore REST API (also works against the emulator)
//! - [`MemoryStore`] - In-process store for local development and tests
//!
//! # Example
//!
//! ```rust,ignore
//! use heritage_storefront::store::{DocumentStore, MemoryStore};
//!
//! let store = MemoryStore::new();
//! let zulu = store.find_eq("products", "culture", "zulu").await?;
//! let p1 = store.get("products", "p1").await?;
//! ```

mod firestore;
mod memory;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::{DocumentStoreConfig, StoreBackend};

pub use firestore::FirestoreClient;
pub use memory::MemoryStore;

/// A stored document: its key plus arbitrary fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Document key within its collection.
    pub id: String,
    /// Field values, decoded to plain JSON.
    pub fields: Map<String, Value>,
}

impl Document {
    /// Create a document from its id and fields.
    #[must_use]
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Errors that can occur when reading from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The store answered with a non-success status.
    #[error("Store returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// Rate limited by the store.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// The store cannot be reached.
    #[error("Store unavailable: {0}")]
    Unavailable(String),

    /// A document or request could not be built or decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// The backend is misconfigured.
    #[error("Invalid store configuration: {0}")]
    Config(String),

    /// A seed file could not be read.
    #[error("Seed file error: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only query port over a hosted document database.
///
/// All operations are collection-scoped. Result order is whatever the store
/// returns.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Every document in a collection.
    async fn list(&self, collection: &str) -> Result<Vec<Document>, StoreError>;

    /// Documents whose `field` equals `value` exactly.
    async fn find_eq(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError>;

    /// Documents whose array-valued `field` contains `value`.
    async fn find_array_contains(
        &self,
        collection: &str,
        field: &str,
        value: &str,
    ) -> Result<Vec<Document>, StoreError>;

    /// A single document by key; `Ok(None)` when it does not exist.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;
}

/// Build the configured document store backend.
///
/// # Errors
///
/// Returns `StoreError` if the endpoint is invalid or the memory seed file
/// cannot be read.
pub fn connect(config: &DocumentStoreConfig) -> Result<Arc<dyn DocumentStore>, StoreError> {
    match config.backend {
        StoreBackend::Firestore => {
            let client = FirestoreClient::new(config)?;
            tracing::info!(
                endpoint = %config.endpoint,
                database = %config.database,
                "Using Firestore document store"
            );
            Ok(Arc::new(client))
        }
        StoreBackend::Memory => {
            let store = match &config.seed_path {
                Some(path) => MemoryStore::from_seed_file(path)?,
                None => MemoryStore::new(),
            };
            tracing::warn!("Using in-memory document store (development only)");
            Ok(Arc::new(store))
        }
    }
}
