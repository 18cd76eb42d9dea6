//! Identity verification.
//!
//! The identity provider owns credentials; the storefront only turns a
//! provider-issued ID token into an [`Identity`]. Verification goes through
//! the [`IdentityVerifier`] port:
//!
//! - [`IdentityToolkitClient`] - Identity Toolkit `accounts:lookup` REST call
//! - [`DevIdentityVerifier`] - treats the token as the uid (local development)

mod error;

pub use error::AuthError;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use heritage_core::Identity;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use serde_json::json;
use tracing::instrument;
use url::Url;

use crate::config::{IdentityBackend, IdentityConfig};

/// Request timeout for identity lookups.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Verifies provider ID tokens.
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify `id_token` and return the identity it belongs to.
    async fn verify(&self, id_token: &str) -> Result<Identity, AuthError>;
}

/// Build the configured verifier.
///
/// # Errors
///
/// Returns `AuthError::Config` if the toolkit backend has no API key or the
/// endpoint is invalid.
pub fn verifier(config: &IdentityConfig) -> Result<Arc<dyn IdentityVerifier>, AuthError> {
    match config.backend {
        IdentityBackend::Toolkit => Ok(Arc::new(IdentityToolkitClient::new(config)?)),
        IdentityBackend::Dev => {
            tracing::warn!("Using development identity verifier (tokens are trusted as uids)");
            Ok(Arc::new(DevIdentityVerifier))
        }
    }
}

/// Client for the Identity Toolkit REST API.
#[derive(Clone)]
pub struct IdentityToolkitClient {
    client: reqwest::Client,
    lookup_url: Url,
    api_key: SecretString,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}

impl IdentityToolkitClient {
    /// Create a new Identity Toolkit client.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Config` if the API key is missing or the endpoint
    /// is not a valid base URL.
    pub fn new(config: &IdentityConfig) -> Result<Self, AuthError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| AuthError::Config("IDENTITY_API_KEY is required".to_string()))?;

        let mut lookup_url = Url::parse(&config.endpoint)
            .map_err(|e| AuthError::Config(format!("invalid endpoint: {e}")))?;
        lookup_url
            .path_segments_mut()
            .map_err(|()| AuthError::Config("endpoint cannot be a base URL".to_string()))?
            .pop_if_empty()
            .push("accounts:lookup");

        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            lookup_url,
            api_key,
        })
    }
}

#[async_trait]
impl IdentityVerifier for IdentityToolkitClient {
    #[instrument(skip_all)]
    async fn verify(&self, id_token: &str) -> Result<Identity, AuthError> {
        let mut url = self.lookup_url.clone();
        url.query_pairs_mut()
            .append_pair("key", self.api_key.expose_secret());

        let response = self
            .client
            .post(url)
            .json(&json!({ "idToken": id_token }))
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if status == StatusCode::BAD_REQUEST {
            return Err(AuthError::InvalidToken);
        }

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text).map_or_else(
                |_| text.chars().take(200).collect::<String>(),
                |body| body.error.message,
            );
            return Err(AuthError::Provider {
                status: status.as_u16(),
                message,
            });
        }

        let lookup: LookupResponse = serde_json::from_str(&text)?;
        let user = lookup
            .users
            .into_iter()
            .next()
            .ok_or(AuthError::InvalidToken)?;

        let identity = Identity::new(user.local_id);
        Ok(match user.email {
            Some(email) => identity.with_email(email),
            None => identity,
        })
    }
}

/// Development verifier: the token is the uid.
///
/// Lets a local storefront running on the memory store sign in as any seeded
/// user. Never enable in production.
#[derive(Debug, Clone, Copy, Default)]
pub struct DevIdentityVerifier;

#[async_trait]
impl IdentityVerifier for DevIdentityVerifier {
    async fn verify(&self, id_token: &str) -> Result<Identity, AuthError> {
        let uid = id_token.trim();
        if uid.is_empty() || uid.chars().any(char::is_whitespace) {
            return Err(AuthError::InvalidToken);
        }
        Ok(Identity::new(uid))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_IDENTITY_ENDPOINT;

    #[tokio::test]
    async fn test_dev_verifier_uses_token_as_uid() {
        let identity = DevIdentityVerifier.verify(" u-admin ").await.unwrap();
        assert_eq!(identity, Identity::new("u-admin"));
    }

    #[tokio::test]
    async fn test_dev_verifier_rejects_blank_tokens() {
        assert!(matches!(
            DevIdentityVerifier.verify("   ").await,
            Err(AuthError::InvalidToken)
        ));
        assert!(matches!(
            DevIdentityVerifier.verify("two words").await,
            Err(AuthError::InvalidToken)
        ));
    }

    #[test]
    fn test_toolkit_client_requires_api_key() {
        let config = IdentityConfig {
            backend: IdentityBackend::Toolkit,
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            api_key: None,
        };
        assert!(matches!(
            IdentityToolkitClient::new(&config),
            Err(AuthError::Config(_))
        ));
    }

    #[test]
    fn test_toolkit_lookup_url() {
        let config = IdentityConfig {
            backend: IdentityBackend::Toolkit,
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            api_key: Some(SecretString::from("AIzaSyD3k9Qw7Lm2Vx8Rt5Bn1Hc6Jp4Zf0Gu")),
        };
        let client = IdentityToolkitClient::new(&config).unwrap();
        assert_eq!(
            client.lookup_url.as_str(),
            "https://identitytoolkit.googleapis.com/v1/accounts:lookup"
        );
    }

    #[test]
    fn test_lookup_response_parsing() {
        let lookup: LookupResponse = serde_json::from_str(
            r#"{"kind": "identitytoolkit#GetAccountInfoResponse",
                "users": [{"localId": "uid-1", "email": "thandi@heritage.example"}]}"#,
        )
        .unwrap();
        let user = lookup.users.into_iter().next().unwrap();
        assert_eq!(user.local_id, "uid-1");
        assert_eq!(user.email.as_deref(), Some("thandi@heritage.example"));
    }

    #[test]
    fn test_lookup_response_without_users() {
        let lookup: LookupResponse = serde_json::from_str("{}").unwrap();
        assert!(lookup.users.is_empty());
    }

    #[tokio::test]
    #[ignore = "Requires network access and a valid IDENTITY_API_KEY"]
    async fn test_toolkit_rejects_garbage_token() {
        let config = IdentityConfig {
            backend: IdentityBackend::Toolkit,
            endpoint: DEFAULT_IDENTITY_ENDPOINT.to_string(),
            api_key: std::env::var("IDENTITY_API_KEY").ok().map(SecretString::from),
        };
        let client = IdentityToolkitClient::new(&config).unwrap();
        assert!(client.verify("not-a-token").await.is_err());
    }
}
