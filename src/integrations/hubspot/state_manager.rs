//! OAuth state management for CSRF protection.
//!
//! The state travels twice: serialized into the authorization URL, and stored
//! server-side under `state:{org_id}:{user_id}`. A callback is accepted only
//! when the token it carries matches the stored one.

use super::error::{IntegrationError, IntegrationResult};
use crate::store::KeyValueStore;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rand::{rngs::OsRng, RngCore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// Random bytes behind each state token
const TOKEN_BYTES: usize = 32;

/// Pending authorization, as embedded in the `state` query parameter
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PendingState {
    /// Random anti-forgery token
    pub state: String,
    pub user_id: String,
    pub org_id: String,
}

/// Store key for the pending state of an org/user pair
pub fn state_key(org_id: &str, user_id: &str) -> String {
    format!("state:{}:{}", org_id, user_id)
}

/// URL-safe random token
fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

fn tokens_match(expected: &str, received: &str) -> bool {
    expected.as_bytes().ct_eq(received.as_bytes()).into()
}

/// Creates and validates pending OAuth states on top of a key-value store.
#[derive(Clone)]
pub struct StateManager {
    store: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl StateManager {
    pub fn new(store: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Generate a new pending state for the pair and store it.
    ///
    /// Overwrites any earlier pending state for the same pair. Returns the
    /// serialized state to embed in the authorization URL.
    pub async fn create_state(&self, user_id: &str, org_id: &str) -> IntegrationResult<String> {
        let pending = PendingState {
            state: generate_token(),
            user_id: user_id.to_string(),
            org_id: org_id.to_string(),
        };
        let encoded = serde_json::to_string(&pending)?;

        self.store
            .set(&state_key(org_id, user_id), &encoded, self.ttl)
            .await?;

        Ok(encoded)
    }

    /// Validate the `state` returned on the callback and consume the stored record.
    ///
    /// The stored record is removed once it matches (single use). A wrong
    /// token leaves it in place; of concurrent callbacks carrying the right
    /// token, only the one that removes the record succeeds.
    pub async fn validate_and_consume(&self, encoded_state: &str) -> IntegrationResult<PendingState> {
        let returned: PendingState = serde_json::from_str(encoded_state).map_err(|e| {
            debug!(error = %e, "Unparseable OAuth state");
            IntegrationError::malformed_callback("Invalid state parameter")
        })?;

        if returned.user_id.is_empty() || returned.org_id.is_empty() {
            return Err(IntegrationError::malformed_callback(
                "State parameter lacks user_id or org_id",
            ));
        }

        let key = state_key(&returned.org_id, &returned.user_id);
        let saved = self.store.get(&key).await?.ok_or_else(|| {
            warn!(
                org_id = %returned.org_id,
                user_id = %returned.user_id,
                "No pending OAuth state (expired or never issued)"
            );
            IntegrationError::StateMismatch
        })?;
        let saved: PendingState = serde_json::from_str(&saved)?;

        if !tokens_match(&saved.state, &returned.state) {
            warn!(
                org_id = %returned.org_id,
                user_id = %returned.user_id,
                "OAuth state token mismatch (possible CSRF attack)"
            );
            return Err(IntegrationError::StateMismatch);
        }

        // Claim the record; a concurrent replay that got here first wins
        let taken = self.store.take(&key).await?;
        let claimed = match taken {
            Some(raw) => {
                let taken: PendingState = serde_json::from_str(&raw)?;
                tokens_match(&taken.state, &returned.state)
            }
            None => false,
        };
        if !claimed {
            warn!(
                org_id = %returned.org_id,
                user_id = %returned.user_id,
                "OAuth state already consumed"
            );
            return Err(IntegrationError::StateMismatch);
        }

        Ok(returned)
    }
}
