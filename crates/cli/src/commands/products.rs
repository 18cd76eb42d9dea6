//! Catalog query commands.
//!
//! # Usage
//!
//! ```bash
//! hm-cli products list
//! hm-cli products list --culture Yoruba
//! hm-cli products list --occasion wedding
//! hm-cli products show p-aso-oke
//! ```

use std::sync::Arc;

use heritage_core::ProductId;
use heritage_storefront::catalog::{Catalog, Product};
use heritage_storefront::config::DocumentStoreConfig;
use heritage_storefront::store::DocumentStore;

use super::{CommandError, print_json};

/// Filter for `products list`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListFilter {
    All,
    Culture(String),
    Occasion(String),
}

/// Products matching `filter`.
///
/// Uses the strict queries so a store failure is reported, not printed as `[]`.
///
/// # Errors
///
/// Returns `CommandError::Store` if the store read fails.
pub async fn query(
    store: Arc<dyn DocumentStore>,
    config: &DocumentStoreConfig,
    filter: &ListFilter,
) -> Result<Vec<Product>, CommandError> {
    let catalog = Catalog::new(store, &config.products_collection);
    let products = match filter {
        ListFilter::All => catalog.try_all_products().await?,
        ListFilter::Culture(culture) => catalog.try_products_by_culture(culture).await?,
        ListFilter::Occasion(occasion) => catalog.try_products_by_occasion(occasion).await?,
    };
    Ok(products)
}

/// Print products matching `filter`.
///
/// # Errors
///
/// Returns `CommandError` if the store read or output fails.
pub async fn list(
    store: Arc<dyn DocumentStore>,
    config: &DocumentStoreConfig,
    filter: &ListFilter,
) -> Result<(), CommandError> {
    let products = query(store, config, filter).await?;
    tracing::info!(count = products.len(), "Fetched products");
    print_json(&products)
}

/// Print a single product.
///
/// # Errors
///
/// Returns `CommandError::NotFound` if no product has `id`.
pub async fn show(
    store: Arc<dyn DocumentStore>,
    config: &DocumentStoreConfig,
    id: &str,
) -> Result<(), CommandError> {
    let catalog = Catalog::new(store, &config.products_collection);
    let product = catalog
        .try_product_by_id(&ProductId::new(id))
        .await?
        .ok_or_else(|| CommandError::NotFound(format!("product {id}")))?;
    print_json(&product)
}
