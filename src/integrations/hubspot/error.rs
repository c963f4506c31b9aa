//! Failure modes of the HubSpot OAuth flow and contact fetch.

use crate::store::StoreError;
use thiserror::Error;

/// Errors returned by [`HubSpotIntegration`](super::HubSpotIntegration).
///
/// None are retried internally; each terminates the current request.
#[derive(Debug, Error)]
pub enum IntegrationError {
    /// HubSpot redirected back with an `error` parameter (e.g. `access_denied`)
    #[error("{0}")]
    ProviderError(String),

    /// Callback parameters missing or unparseable
    #[error("Malformed callback: {reason}")]
    MalformedCallback { reason: String },

    /// Returned state does not match a live pending state for the org/user pair
    #[error("State does not match.")]
    StateMismatch,

    /// Token endpoint answered with a non-success status
    #[error("Failed to obtain credentials ({status}): {body}")]
    TokenExchangeFailed { status: u16, body: String },

    /// No live credentials for the org/user pair (never authorized, or expired)
    #[error("No credentials found.")]
    CredentialsNotFound,

    /// Credential record has no usable access token
    #[error("No valid access token found.")]
    MissingAccessToken,

    /// Serialized credentials could not be parsed
    #[error("Malformed credentials: {0}")]
    MalformedCredentials(String),

    /// Contact listing answered with a non-success status
    #[error("Error fetching items from HubSpot ({status}): {body}")]
    UpstreamFetchFailed { status: u16, body: String },

    /// A required identifier was empty
    #[error("Missing {0}")]
    MissingIdentifier(&'static str),

    /// HubSpot answered successfully but with a body we cannot use
    #[error("Unexpected response from HubSpot: {0}")]
    InvalidProviderResponse(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl IntegrationError {
    pub(crate) fn malformed_callback(reason: impl Into<String>) -> Self {
        IntegrationError::MalformedCallback {
            reason: reason.into(),
        }
    }
}

pub type IntegrationResult<T> = Result<T, IntegrationError>;
