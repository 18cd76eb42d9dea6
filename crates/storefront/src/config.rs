//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront
//! - `DOCUMENT_STORE_PROJECT_ID` - Store project id (firestore backend only)
//! - `IDENTITY_API_KEY` - Identity provider web API key (toolkit backend only)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STORE_BACKEND` - `firestore` or `memory` (default: firestore)
//! - `DOCUMENT_STORE_ENDPOINT` - REST endpoint (default: <https://firestore.googleapis.com/v1>)
//! - `DOCUMENT_STORE_DATABASE` - Database id (default: `(default)`)
//! - `DOCUMENT_STORE_TOKEN` - Bearer token for store reads
//! - `DOCUMENT_STORE_SEED` - JSON seed file for the memory backend
//! - `PRODUCTS_COLLECTION` - Product collection (default: products)
//! - `USERS_COLLECTION` - User role collection (default: users)
//! - `IDENTITY_BACKEND` - `toolkit` or `dev` (default: toolkit)
//! - `IDENTITY_ENDPOINT` - Identity Toolkit endpoint (default: <https://identitytoolkit.googleapis.com/v1>)
//! - `ROLE_SETTLE_TIMEOUT_MS` - How long role-gated pages wait for role resolution (default: 1500)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Default Firestore REST endpoint.
pub const DEFAULT_STORE_ENDPOINT: &str = "https://firestore.googleapis.com/v1";

/// Default Identity Toolkit REST endpoint.
pub const DEFAULT_IDENTITY_ENDPOINT: &str = "https://identitytoolkit.googleapis.com/v1";

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Document store configuration
    pub store: DocumentStoreConfig,
    /// Identity provider configuration
    pub identity: IdentityConfig,
    /// How long role-gated pages wait for role resolution to settle
    pub role_settle_timeout: Duration,
    /// Sentry configuration
    pub sentry: SentryConfig,
}

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Hosted Firestore (or its emulator) over REST.
    Firestore,
    /// In-process store, optionally seeded from a JSON file.
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "firestore" => Ok(Self::Firestore),
            "memory" => Ok(Self::Memory),
            _ => Err(format!("expected firestore or memory, got {s}")),
        }
    }
}

/// Document store configuration.
///
/// Implements `Debug` manually to redact the access token.
#[derive(Clone)]
pub struct DocumentStoreConfig {
    /// Backend selection
    pub backend: StoreBackend,
    /// REST endpoint (point at the emulator for local runs)
    pub endpoint: String,
    /// Project id (required for the firestore backend)
    pub project_id: Option<String>,
    /// Database id
    pub database: String,
    /// Optional bearer token for reads
    pub token: Option<SecretString>,
    /// JSON seed file for the memory backend
    pub seed_path: Option<PathBuf>,
    /// Collection holding products
    pub products_collection: String,
    /// Collection holding user role records, keyed by uid
    pub users_collection: String,
}

impl std::fmt::Debug for DocumentStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentStoreConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("project_id", &self.project_id)
            .field("database", &self.database)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("seed_path", &self.seed_path)
            .field("products_collection", &self.products_collection)
            .field("users_collection", &self.users_collection)
            .finish()
    }
}

/// Which identity verifier to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityBackend {
    /// Verify ID tokens against the Identity Toolkit REST API.
    Toolkit,
    /// Accept the token as the uid. Local development only.
    Dev,
}

impl std::str::FromStr for IdentityBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "toolkit" => Ok(Self::Toolkit),
            "dev" => Ok(Self::Dev),
            _ => Err(format!("expected toolkit or dev, got {s}")),
        }
    }
}

/// Identity provider configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct IdentityConfig {
    /// Backend selection
    pub backend: IdentityBackend,
    /// Identity Toolkit endpoint
    pub endpoint: String,
    /// Web API key (required for the toolkit backend)
    pub api_key: Option<SecretString>,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("backend", &self.backend)
            .field("endpoint", &self.endpoint)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Sentry error tracking configuration.
#[derive(Debug, Clone)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when unset
    pub dsn: Option<String>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Performance trace sample rate
    pub traces_sample_rate: f32,
}

impl Default for SentryConfig {
    fn default() -> Self {
        Self {
            dsn: None,
            environment: None,
            sample_rate: 1.0,
            traces_sample_rate: 0.0,
        }
    }
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = parse_env_or_default::<IpAddr>("STOREFRONT_HOST", "127.0.0.1")?;
        let port = parse_env_or_default::<u16>("STOREFRONT_PORT", "3000")?;
        let base_url = get_required_env("STOREFRONT_BASE_URL")?;
        let store = DocumentStoreConfig::from_env()?;
        let identity = IdentityConfig::from_env()?;
        let role_settle_timeout = Duration::from_millis(parse_env_or_default::<u64>(
            "ROLE_SETTLE_TIMEOUT_MS",
            "1500",
        )?);
        let sentry = SentryConfig::from_env()?;

        Ok(Self {
            host,
            port,
            base_url,
            store,
            identity,
            role_settle_timeout,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether session cookies should be marked `Secure`.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl DocumentStoreConfig {
    /// Load the store section from environment variables.
    ///
    /// Shared by the storefront and the CLI.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the backend is unknown, the firestore backend
    /// has no project id, or the token looks like a placeholder.
    pub fn from_env() -> Result<Self, ConfigError> {
        let backend = parse_env_or_default::<StoreBackend>("STORE_BACKEND", "firestore")?;
        let project_id = get_optional_env("DOCUMENT_STORE_PROJECT_ID");
        if backend == StoreBackend::Firestore && project_id.is_none() {
            return Err(ConfigError::MissingEnvVar(
                "DOCUMENT_STORE_PROJECT_ID".to_string(),
            ));
        }

        Ok(Self {
            backend,
            endpoint: get_env_or_default("DOCUMENT_STORE_ENDPOINT", DEFAULT_STORE_ENDPOINT),
            project_id,
            database: get_env_or_default("DOCUMENT_STORE_DATABASE", "(default)"),
            token: get_optional_validated_secret("DOCUMENT_STORE_TOKEN")?,
            seed_path: get_optional_env("DOCUMENT_STORE_SEED").map(PathBuf::from),
            products_collection: get_env_or_default("PRODUCTS_COLLECTION", "products"),
            users_collection: get_env_or_default("USERS_COLLECTION", "users"),
        })
    }

    /// A memory-backed configuration with default collection names.
    #[must_use]
    pub fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            endpoint: DEFAULT_STORE_ENDPOINT.to_string(),
            project_id: None,
            database: "(default)".to_string(),
            token: None,
            seed_path: None,
            products_collection: "products".to_string(),
            users_collection: "users".to_string(),
        }
    }
}

impl IdentityConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = parse_env_or_default::<IdentityBackend>("IDENTITY_BACKEND", "toolkit")?;
        let api_key = match backend {
            IdentityBackend::Toolkit => Some(get_validated_secret("IDENTITY_API_KEY")?),
            IdentityBackend::Dev => None,
        };

        Ok(Self {
            backend,
            endpoint: get_env_or_default("IDENTITY_ENDPOINT", DEFAULT_IDENTITY_ENDPOINT),
            api_key,
        })
    }
}

impl SentryConfig {
    fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            dsn: get_optional_env("SENTRY_DSN"),
            environment: get_optional_env("SENTRY_ENVIRONMENT"),
            sample_rate: parse_env_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: parse_env_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable, falling back to a default string.
fn parse_env_or_default<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    get_env_or_default(key, default)
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InsecureSecret(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    // Real API keys and tokens have high entropy
    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use the key issued by the provider."
            ),
        ));
    }

    Ok(())
}

/// Load and validate a required secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}

/// Load and validate a secret from environment if it is set.
fn get_optional_validated_secret(key: &str) -> Result<Option<SecretString>, ConfigError> {
    get_optional_env(key)
        .map(|value| {
            validate_secret_strength(&value, key)?;
            Ok(SecretString::from(value))
        })
        .transpose()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn config() -> StorefrontConfig {
        StorefrontConfig {
            host: "127.0.0.1".parse().unwrap(),
            port: 3000,
            base_url: "http://localhost:3000".to_string(),
            store: DocumentStoreConfig::memory(),
            identity: IdentityConfig {
                backend: IdentityBackend::Dev,
                endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
                api_key: None,
            },
            role_settle_timeout: Duration::from_millis(1500),
            sentry: SentryConfig::default(),
        }
    }

    #[test]
    fn test_shannon_entropy_empty() {
        assert!((shannon_entropy("") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_single_char() {
        assert!((shannon_entropy("aaaaaaa") - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_shannon_entropy_two_chars() {
        let entropy = shannon_entropy("ab");
        assert!((entropy - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_validate_secret_strength_placeholder() {
        let result = validate_secret_strength("your-api-key-here", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_low_entropy() {
        let result = validate_secret_strength("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa", "TEST_VAR");
        assert!(matches!(result, Err(ConfigError::InsecureSecret(_, _))));
    }

    #[test]
    fn test_validate_secret_strength_valid() {
        let result = validate_secret_strength("AIzaSyD3k9Qw7Lm2Vx8Rt5Bn1Hc6Jp4Zf0Gu", "TEST_VAR");
        assert!(result.is_ok());
    }

    #[test]
    fn test_store_backend_parse() {
        assert_eq!("memory".parse::<StoreBackend>(), Ok(StoreBackend::Memory));
        assert_eq!(
            "firestore".parse::<StoreBackend>(),
            Ok(StoreBackend::Firestore)
        );
        assert!("postgres".parse::<StoreBackend>().is_err());
    }

    #[test]
    fn test_identity_backend_parse() {
        assert_eq!("dev".parse::<IdentityBackend>(), Ok(IdentityBackend::Dev));
        assert!("oauth".parse::<IdentityBackend>().is_err());
    }

    #[test]
    fn test_socket_addr() {
        let addr = config().socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 3000);
    }

    #[test]
    fn test_is_secure_follows_base_url() {
        let mut config = config();
        assert!(!config.is_secure());
        config.base_url = "https://heritage.example".to_string();
        assert!(config.is_secure());
    }

    #[test]
    fn test_store_config_debug_redacts_token() {
        let mut store = DocumentStoreConfig::memory();
        store.token = Some(SecretString::from("ya29.super_secret_access_token"));

        let debug_output = format!("{store:?}");
        assert!(debug_output.contains("products"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("super_secret_access_token"));
    }

    #[test]
    fn test_identity_config_debug_redacts_api_key() {
        let identity = IdentityConfig {
            backend: IdentityBackend::Toolkit,
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            api_key: Some(SecretString::from("AIzaSyD3k9Qw7Lm2Vx8Rt5Bn1Hc6Jp4Zf0Gu")),
        };

        let debug_output = format!("{identity:?}");
        assert!(debug_output.contains("identitytoolkit"));
        assert!(!debug_output.contains("AIzaSyD3k9Qw7Lm2Vx8Rt5Bn1Hc6Jp4Zf0Gu"));
    }
}
