//! Command implementations.
//!
//! Every command reads from the configured document store, or from an
//! in-memory store loaded from `--seed FILE`, and prints JSON to stdout.

pub mod products;
pub mod role;

use std::path::Path;
use std::sync::Arc;

use heritage_storefront::config::{ConfigError, DocumentStoreConfig};
use heritage_storefront::store::{self, DocumentStore, StoreError};
use thiserror::Error;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Store configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Store read failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Output could not be serialized.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Requested document does not exist.
    #[error("Not found: {0}")]
    NotFound(String),
}

/// Store settings from `--seed` or the environment.
///
/// # Errors
///
/// Returns `CommandError::Config` if the environment is incomplete.
pub fn store_config(seed: Option<&Path>) -> Result<DocumentStoreConfig, CommandError> {
    match seed {
        Some(path) => Ok(DocumentStoreConfig {
            seed_path: Some(path.to_path_buf()),
            ..DocumentStoreConfig::memory()
        }),
        None => {
            dotenvy::dotenv().ok();
            Ok(DocumentStoreConfig::from_env()?)
        }
    }
}

/// Connect to the store described by `config`.
///
/// # Errors
///
/// Returns `CommandError::Store` if the backend cannot be built.
pub fn connect(config: &DocumentStoreConfig) -> Result<Arc<dyn DocumentStore>, CommandError> {
    Ok(store::connect(config)?)
}

/// Print a value as pretty JSON.
#[allow(clippy::print_stdout)]
fn print_json(value: &impl serde::Serialize) -> Result<(), CommandError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
