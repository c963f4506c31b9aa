//! OAuth token exchange logic.
//!
//! Handles exchanging authorization codes for access tokens.

use super::credentials::Credentials;
use super::error::{IntegrationError, IntegrationResult};
use crate::config::HubSpotConfig;
use reqwest::Client;
use tracing::{debug, error};

/// Exchange an authorization code for credentials.
///
/// Single form-encoded POST to the token endpoint, no retry. The returned
/// credentials have no `expires_at` yet; the caller stamps it.
pub async fn exchange_code_for_token(
    http_client: &Client,
    config: &HubSpotConfig,
    code: &str,
) -> IntegrationResult<Credentials> {
    let form_data = [
        ("grant_type", "authorization_code"),
        ("code", code),
        ("redirect_uri", config.redirect_uri.as_str()),
        ("client_id", config.client_id.as_str()),
        ("client_secret", config.client_secret.as_str()),
    ];

    debug!(token_url = %config.token_url, "Exchanging authorization code for token");

    let response = http_client
        .post(&config.token_url)
        .header("Accept", "application/json")
        .form(&form_data)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());
        error!(status = status.as_u16(), body = %body, "Token exchange failed");
        return Err(IntegrationError::TokenExchangeFailed {
            status: status.as_u16(),
            body,
        });
    }

    let body = response.text().await?;
    let credentials: Credentials = serde_json::from_str(&body).map_err(|e| {
        error!(error = %e, "Token response is not a usable token");
        IntegrationError::InvalidProviderResponse(format!("token response: {}", e))
    })?;

    debug!(
        has_refresh_token = credentials.refresh_token.is_some(),
        expires_in = ?credentials.expires_in,
        "Token exchange successful"
    );

    Ok(credentials)
}
