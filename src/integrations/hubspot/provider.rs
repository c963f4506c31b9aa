//! HubSpot authorization URL construction.

use crate::config::HubSpotConfig;

/// Build the authorization URL the user is sent to.
///
/// `state` is embedded verbatim (percent-encoded) and comes back unchanged on
/// the callback.
pub fn build_auth_url(config: &HubSpotConfig, state: &str) -> String {
    let scopes = config.scopes.join(" ");
    format!(
        "{}?client_id={}&response_type=code&redirect_uri={}&scope={}&state={}",
        config.authorize_url,
        urlencoding::encode(&config.client_id),
        urlencoding::encode(&config.redirect_uri),
        urlencoding::encode(&scopes),
        urlencoding::encode(state)
    )
}
