//! Stored HubSpot credentials.
//!
//! The full token response is kept, including fields we do not model, so a
//! read returns exactly what the callback stored.

use super::error::{IntegrationError, IntegrationResult};
use crate::store::{Clock, KeyValueStore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Token endpoint response plus the computed token expiry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    /// OAuth access token (used for API requests)
    pub access_token: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,

    /// Token lifetime in seconds, as reported by HubSpot
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,

    /// When the access token expires (UTC), derived from `expires_in`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,

    /// Any other fields from the token response
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Credentials {
    /// Fill `expires_at` from `expires_in`, counted from `obtained_at`.
    ///
    /// An `expires_in` that cannot be represented as a timestamp is rejected.
    pub fn stamp_expiry(&mut self, obtained_at: DateTime<Utc>) -> IntegrationResult<()> {
        if self.expires_at.is_some() {
            return Ok(());
        }
        if let Some(seconds) = self.expires_in {
            let expires_at = Duration::try_seconds(seconds)
                .and_then(|lifetime| obtained_at.checked_add_signed(lifetime))
                .ok_or_else(|| {
                    IntegrationError::InvalidProviderResponse(format!(
                        "expires_in out of range: {}",
                        seconds
                    ))
                })?;
            self.expires_at = Some(expires_at);
        }
        Ok(())
    }

    /// Whether the provider-side token lifetime has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| now >= at)
    }
}

/// Store key for the credentials of an org/user pair
pub fn credentials_key(org_id: &str, user_id: &str) -> String {
    format!("credentials:{}:{}", org_id, user_id)
}

/// Reads and writes credential records in the key-value store.
#[derive(Clone)]
pub struct CredentialStore {
    store: Arc<dyn KeyValueStore>,
    ttl: std::time::Duration,
    clock: Arc<dyn Clock>,
}

impl CredentialStore {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: std::time::Duration, clock: Arc<dyn Clock>) -> Self {
        Self { store, ttl, clock }
    }

    /// Store credentials for the pair, replacing any existing record
    pub async fn store(
        &self,
        user_id: &str,
        org_id: &str,
        credentials: &Credentials,
    ) -> IntegrationResult<()> {
        let encoded = serde_json::to_string(credentials)?;
        self.store
            .set(&credentials_key(org_id, user_id), &encoded, self.ttl)
            .await?;
        Ok(())
    }

    /// Fetch live credentials for the pair.
    ///
    /// Absent, store-expired and provider-expired records all report
    /// `CredentialsNotFound`: the user has to authorize again.
    pub async fn get(&self, user_id: &str, org_id: &str) -> IntegrationResult<Credentials> {
        let raw = self
            .store
            .get(&credentials_key(org_id, user_id))
            .await?
            .ok_or_else(|| {
                warn!(user_id = %user_id, org_id = %org_id, "No credentials found");
                IntegrationError::CredentialsNotFound
            })?;

        let credentials: Credentials = serde_json::from_str(&raw)?;

        if credentials.is_expired(self.clock.now()) {
            debug!(user_id = %user_id, org_id = %org_id, "Stored access token has expired");
            return Err(IntegrationError::CredentialsNotFound);
        }

        Ok(credentials)
    }
}
