//! HubSpot OAuth 2.0 connection and contact fetch.
//!
//! Implements the authorization code flow:
//! 1. `authorize` → authorization URL with a stored anti-forgery state
//! 2. User authorizes on HubSpot's site (popup window)
//! 3. HubSpot redirects to the callback → `oauth2_callback` validates the
//!    state, exchanges the code and stores the credentials
//! 4. `get_credentials` hands the stored credentials to the front-end
//! 5. `get_items` lists contacts with those credentials

mod contacts;
mod credentials;
mod error;
mod exchange;
mod provider;
mod state_manager;
mod transformer;

pub use contacts::{ContactProperties, HubSpotContact};
pub use credentials::{credentials_key, CredentialStore, Credentials};
pub use error::{IntegrationError, IntegrationResult};
pub use state_manager::{state_key, PendingState, StateManager};
pub use transformer::{contact_to_item, CONTACT_ITEM_TYPE};

use crate::config::HubLinkConfig;
use crate::config::HubSpotConfig;
use crate::integrations::IntegrationItem;
use crate::store::{Clock, KeyValueStore, SystemClock};
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Query parameters HubSpot sends to the redirect URI
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

/// HubSpot integration: authorization, callback, credential lookup, contact fetch.
#[derive(Clone)]
pub struct HubSpotIntegration {
    config: Arc<HubSpotConfig>,
    http_client: Client,
    states: StateManager,
    credentials: CredentialStore,
    clock: Arc<dyn Clock>,
}

impl HubSpotIntegration {
    /// Create the integration on top of `store`, using the wall clock.
    pub fn new(config: &HubLinkConfig, store: Arc<dyn KeyValueStore>) -> anyhow::Result<Self> {
        Self::with_clock(config, store, Arc::new(SystemClock))
    }

    /// Create the integration with an explicit time source for token expiry.
    pub fn with_clock(
        config: &HubLinkConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> anyhow::Result<Self> {
        let http_client = Client::builder()
            .user_agent(concat!("hubspot-link/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to build HTTP client")?;

        let states = StateManager::new(
            store.clone(),
            Duration::from_secs(config.store.state_ttl_seconds),
        );
        let credentials = CredentialStore::new(
            store,
            Duration::from_secs(config.store.credentials_ttl_seconds),
            clock.clone(),
        );

        Ok(Self {
            config: Arc::new(config.hubspot.clone()),
            http_client,
            states,
            credentials,
            clock,
        })
    }

    /// Start an authorization for the pair and return the URL to open.
    ///
    /// Any earlier pending authorization for the same pair is superseded.
    pub async fn authorize(&self, user_id: &str, org_id: &str) -> IntegrationResult<String> {
        require_identifiers(user_id, org_id)?;

        let encoded_state = self.states.create_state(user_id, org_id).await?;
        debug!(user_id = %user_id, org_id = %org_id, "Pending OAuth state stored");

        Ok(provider::build_auth_url(&self.config, &encoded_state))
    }

    /// Handle HubSpot's redirect back to us.
    ///
    /// On success the credentials are stored for the org/user pair named in
    /// the validated state, and that pair is returned.
    pub async fn oauth2_callback(&self, params: CallbackParams) -> IntegrationResult<PendingState> {
        if let Some(error) = params.error.filter(|e| !e.is_empty()) {
            warn!(
                error = %error,
                description = params.error_description.as_deref().unwrap_or(""),
                "HubSpot authorization failed"
            );
            return Err(IntegrationError::ProviderError(error));
        }

        let (code, encoded_state) = match (non_empty(params.code), non_empty(params.state)) {
            (Some(code), Some(state)) => (code, state),
            _ => {
                return Err(IntegrationError::malformed_callback(
                    "Missing code or state parameter",
                ))
            }
        };

        let pending = self.states.validate_and_consume(&encoded_state).await?;
        debug!(user_id = %pending.user_id, org_id = %pending.org_id, "OAuth state validated");

        let mut credentials =
            exchange::exchange_code_for_token(&self.http_client, &self.config, &code).await?;
        credentials.stamp_expiry(self.clock.now())?;

        self.credentials
            .store(&pending.user_id, &pending.org_id, &credentials)
            .await?;

        info!(
            user_id = %pending.user_id,
            org_id = %pending.org_id,
            has_refresh_token = credentials.refresh_token.is_some(),
            "Credentials stored"
        );

        Ok(pending)
    }

    /// Stored credentials for the pair
    pub async fn get_credentials(&self, user_id: &str, org_id: &str) -> IntegrationResult<Credentials> {
        require_identifiers(user_id, org_id)?;
        self.credentials.get(user_id, org_id).await
    }

    /// Fetch one page of contacts as integration items, in HubSpot's order.
    pub async fn get_items(&self, credentials: &Credentials) -> IntegrationResult<Vec<IntegrationItem>> {
        self.fetch_items(&credentials.access_token).await
    }

    /// Same as `get_items`, for credentials in their serialized form.
    pub async fn get_items_from_json(&self, raw_credentials: &str) -> IntegrationResult<Vec<IntegrationItem>> {
        let value: serde_json::Value = serde_json::from_str(raw_credentials)
            .map_err(|e| IntegrationError::MalformedCredentials(e.to_string()))?;
        let access_token = value
            .get("access_token")
            .and_then(|t| t.as_str())
            .ok_or(IntegrationError::MissingAccessToken)?;
        self.fetch_items(access_token).await
    }

    async fn fetch_items(&self, access_token: &str) -> IntegrationResult<Vec<IntegrationItem>> {
        if access_token.is_empty() {
            return Err(IntegrationError::MissingAccessToken);
        }

        let client =
            contacts::ContactsClient::new(&self.http_client, &self.config.api_base_url, access_token);
        let contacts = client.fetch_contacts().await?;

        Ok(contacts.iter().map(contact_to_item).collect())
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn require_identifiers(user_id: &str, org_id: &str) -> IntegrationResult<()> {
    if user_id.is_empty() {
        return Err(IntegrationError::MissingIdentifier("user_id"));
    }
    if org_id.is_empty() {
        return Err(IntegrationError::MissingIdentifier("org_id"));
    }
    Ok(())
}
