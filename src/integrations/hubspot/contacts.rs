use super::error::{IntegrationError, IntegrationResult};
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

/// Path of the CRM contact listing endpoint
const CONTACTS_PATH: &str = "/crm/v3/objects/contacts";

/// One page of the contact listing.
#[derive(Debug, Default, Deserialize)]
pub struct ContactPage {
    #[serde(default)]
    pub results: Vec<HubSpotContact>,
}

/// HubSpot contact object.
#[derive(Debug, Deserialize)]
pub struct HubSpotContact {
    pub id: String,
    #[serde(default)]
    pub properties: ContactProperties,
}

/// Contact properties we read. HubSpot sends `null` for unset values.
#[derive(Debug, Default, Deserialize)]
pub struct ContactProperties {
    #[serde(default)]
    pub firstname: Option<String>,
    #[serde(default)]
    pub lastname: Option<String>,
    #[serde(default)]
    pub createdate: Option<String>,
    #[serde(default)]
    pub lastmodifieddate: Option<String>,
}

/// HTTP client for the HubSpot CRM contacts API.
pub struct ContactsClient<'a> {
    http_client: &'a Client,
    base_url: &'a str,
    access_token: &'a str,
}

impl<'a> ContactsClient<'a> {
    pub fn new(http_client: &'a Client, base_url: &'a str, access_token: &'a str) -> Self {
        Self {
            http_client,
            base_url,
            access_token,
        }
    }

    /// Fetch the first page of contacts. No pagination cursor is followed.
    pub async fn fetch_contacts(&self) -> IntegrationResult<Vec<HubSpotContact>> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), CONTACTS_PATH);
        let response = self
            .http_client
            .get(&url)
            .bearer_auth(self.access_token)
            .header("Content-Type", "application/json")
            .send()
            .await?;

        let status = response.status();
        if status != reqwest::StatusCode::OK {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!(status = status.as_u16(), "HubSpot contact listing failed");
            return Err(IntegrationError::UpstreamFetchFailed {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        let page: ContactPage = serde_json::from_str(&body).map_err(|e| {
            IntegrationError::InvalidProviderResponse(format!("contact listing: {}", e))
        })?;

        debug!(count = page.results.len(), "Fetched HubSpot contacts");
        Ok(page.results)
    }
}
