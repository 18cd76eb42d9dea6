//! Authentication error types.

use thiserror::Error;

/// Errors that can occur while verifying an identity.
#[derive(Debug, Error)]
pub enum AuthError {
    /// HTTP request to the identity provider failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Provider response could not be parsed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Token is malformed, expired, or revoked.
    #[error("invalid identity token")]
    InvalidToken,

    /// Provider answered with an unexpected status.
    #[error("identity provider returned {status}: {message}")]
    Provider {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body.
        message: String,
    },

    /// Verifier is misconfigured.
    #[error("invalid identity configuration: {0}")]
    Config(String),
}
