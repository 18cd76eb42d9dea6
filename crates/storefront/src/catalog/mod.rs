//! Product catalog queries.
//!
//! Four read-only queries over the products collection: all products, by
//! culture, by occasion, and by id. Each comes in two flavours:
//!
//! - `try_*` returns `Result<_, StoreError>` for callers that need to tell
//!   "nothing matched" apart from "the store failed" (readiness, CLI)
//! - the plain form is fail-soft: a store failure is logged and becomes an
//!   empty list or `None`, so a listing page degrades to "no items"
//!
//! There is no retry and no caching. Every call reads the current snapshot.

mod product;

use std::sync::Arc;

use heritage_core::ProductId;
use tracing::instrument;

use crate::store::{DocumentStore, StoreError};

pub use product::Product;

/// Field holding a product's culture tag.
pub const CULTURE_FIELD: &str = "culture";

/// Field holding a product's occasion tags.
pub const OCCASIONS_FIELD: &str = "occasions";

/// Document id read by the readiness check. Need not exist.
///
/// Firestore rejects ids matching `__.*__`, so this must stay outside that
/// pattern.
pub const READINESS_DOCUMENT_ID: &str = "readiness-check";

/// Read-only query layer over the products collection.
#[derive(Clone)]
pub struct Catalog {
    store: Arc<dyn DocumentStore>,
    collection: Arc<str>,
}

impl Catalog {
    /// Create a catalog reading from `collection`.
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, collection: &str) -> Self {
        Self {
            store,
            collection: Arc::from(collection),
        }
    }

    /// Every product, in store order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store read fails.
    #[instrument(skip(self))]
    pub async fn try_all_products(&self) -> Result<Vec<Product>, StoreError> {
        let documents = self.store.list(&self.collection).await?;
        Ok(documents.into_iter().map(Product::from_document).collect())
    }

    /// Products whose `culture` equals `culture` exactly (case-sensitive).
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store read fails.
    #[instrument(skip(self))]
    pub async fn try_products_by_culture(
        &self,
        culture: &str,
    ) -> Result<Vec<Product>, StoreError> {
        let documents = self
            .store
            .find_eq(&self.collection, CULTURE_FIELD, culture)
            .await?;
        Ok(documents.into_iter().map(Product::from_document).collect())
    }

    /// Products whose `occasions` array contains `occasion`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store read fails.
    #[instrument(skip(self))]
    pub async fn try_products_by_occasion(
        &self,
        occasion: &str,
    ) -> Result<Vec<Product>, StoreError> {
        let documents = self
            .store
            .find_array_contains(&self.collection, OCCASIONS_FIELD, occasion)
            .await?;
        Ok(documents.into_iter().map(Product::from_document).collect())
    }

    /// A single product; `Ok(None)` when the id does not exist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store read fails.
    #[instrument(skip(self, id), fields(product_id = %id))]
    pub async fn try_product_by_id(&self, id: &ProductId) -> Result<Option<Product>, StoreError> {
        let document = self.store.get(&self.collection, id.as_str()).await?;
        Ok(document.map(Product::from_document))
    }

    /// Every product; empty if the store read fails.
    pub async fn all_products(&self) -> Vec<Product> {
        self.try_all_products()
            .await
            .unwrap_or_else(|e| fail_soft(&e, "all products", Vec::new))
    }

    /// Products for a culture; empty if the store read fails.
    pub async fn products_by_culture(&self, culture: &str) -> Vec<Product> {
        self.try_products_by_culture(culture)
            .await
            .unwrap_or_else(|e| fail_soft(&e, "products by culture", Vec::new))
    }

    /// Products for an occasion; empty if the store read fails.
    pub async fn products_by_occasion(&self, occasion: &str) -> Vec<Product> {
        self.try_products_by_occasion(occasion)
            .await
            .unwrap_or_else(|e| fail_soft(&e, "products by occasion", Vec::new))
    }

    /// A single product; `None` if it does not exist or the store read fails.
    pub async fn product_by_id(&self, id: &ProductId) -> Option<Product> {
        self.try_product_by_id(id)
            .await
            .unwrap_or_else(|e| fail_soft(&e, "product by id", || None))
    }

    /// Check that the store answers reads.
    ///
    /// # Errors
    ///
    /// Returns `StoreError` if the store read fails.
    pub async fn check_ready(&self) -> Result<(), StoreError> {
        self.store
            .get(&self.collection, READINESS_DOCUMENT_ID)
            .await
            .map(|_| ())
    }
}

/// Log a swallowed store failure and produce the fallback value.
fn fail_soft<T>(error: &StoreError, query: &str, fallback: impl FnOnce() -> T) -> T {
    tracing::error!(error = %error, query, "Catalog query failed, returning empty result");
    fallback()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::store::MemoryStore;

    fn store() -> MemoryStore {
        MemoryStore::from_seed(&json!({
            "products": [
                {"id": "p1", "name": "Isicholo hat", "culture": "zulu", "occasions": ["wedding"]},
                {"id": "p2", "name": "Umbhaco skirt", "culture": "xhosa", "occasions": ["funeral"]}
            ]
        }))
        .unwrap()
    }

    fn catalog(store: &MemoryStore) -> Catalog {
        Catalog::new(Arc::new(store.clone()), "products")
    }

    fn ids(products: &[Product]) -> Vec<&str> {
        products.iter().map(|p| p.id.as_str()).collect()
    }

    #[tokio::test]
    async fn test_products_by_culture() {
        let store = store();
        let products = catalog(&store).products_by_culture("zulu").await;
        assert_eq!(ids(&products), ["p1"]);
        assert!(products.iter().all(|p| p.culture() == Some("zulu")));
    }

    #[tokio::test]
    async fn test_products_by_culture_is_exact() {
        let store = store();
        assert!(catalog(&store).products_by_culture("Zulu").await.is_empty());
        assert!(catalog(&store).products_by_culture("zul").await.is_empty());
    }

    #[tokio::test]
    async fn test_products_by_occasion() {
        let store = store();
        let products = catalog(&store).products_by_occasion("funeral").await;
        assert_eq!(ids(&products), ["p2"]);
        assert!(products.iter().all(|p| p.occasions().contains(&"funeral")));
    }

    #[tokio::test]
    async fn test_product_by_id_missing_is_none() {
        let store = store();
        assert!(
            catalog(&store)
                .product_by_id(&ProductId::new("p3"))
                .await
                .is_none()
        );
    }

    #[tokio::test]
    async fn test_product_by_id_found() {
        let store = store();
        let product = catalog(&store)
            .product_by_id(&ProductId::new("p1"))
            .await
            .unwrap();
        assert_eq!(product.name(), "Isicholo hat");
    }

    #[tokio::test]
    async fn test_all_products_is_idempotent() {
        let store = store();
        let catalog = catalog(&store);
        let first = catalog.all_products().await;
        let second = catalog.all_products().await;
        assert_eq!(first, second);
        assert_eq!(first.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_is_fail_soft() {
        let store = store();
        store.set_offline(true);
        let catalog = catalog(&store);

        assert!(catalog.all_products().await.is_empty());
        assert!(catalog.products_by_culture("zulu").await.is_empty());
        assert!(catalog.products_by_occasion("wedding").await.is_empty());
        assert!(catalog.product_by_id(&ProductId::new("p1")).await.is_none());
    }

    #[tokio::test]
    async fn test_strict_queries_surface_store_failure() {
        let store = store();
        store.set_offline(true);
        let catalog = catalog(&store);

        assert!(catalog.try_all_products().await.is_err());
        assert!(catalog.try_product_by_id(&ProductId::new("p1")).await.is_err());
        assert!(catalog.check_ready().await.is_err());
    }

    #[tokio::test]
    async fn test_readiness_succeeds_when_online() {
        let store = store();
        assert!(catalog(&store).check_ready().await.is_ok());
    }

    #[test]
    fn test_readiness_document_id_is_not_reserved() {
        let id = READINESS_DOCUMENT_ID;
        assert!(!(id.starts_with("__") && id.ends_with("__")));
        assert!(!id.is_empty() && !id.contains('/'));
        assert!(id != "." && id != "..");
    }
}
