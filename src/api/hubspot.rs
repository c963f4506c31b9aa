//! HubSpot integration endpoints.
//!
//! - POST /integrations/hubspot/authorize          → authorization URL
//! - GET  /integrations/hubspot/oauth2callback     → closes the OAuth popup
//! - POST /integrations/hubspot/credentials        → stored credentials
//! - POST /integrations/hubspot/get_hubspot_items  → contacts as items

use crate::integrations::hubspot::{
    CallbackParams, Credentials, HubSpotIntegration, IntegrationError,
};
use crate::integrations::IntegrationItem;
use axum::{
    extract::{Form, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};

#[cfg(test)]
mod tests;

/// Final page of the popup flow: closes the window it is loaded in.
pub const CLOSE_WINDOW_HTML: &str = r#"<html>
    <script>
        window.close();
    </script>
</html>
"#;

/// Error response
#[derive(Serialize)]
struct ErrorResponse {
    detail: String,
}

/// Application error types for integration endpoints
#[derive(Debug)]
enum AppError {
    BadRequest(String),
    Upstream(StatusCode, String),
    ServerError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Upstream(status, msg) => (status, msg),
            AppError::ServerError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { detail })).into_response()
    }
}

/// Mirror an upstream error status, falling back to 500 for anything that is
/// not an error status.
fn upstream_status(status: u16) -> StatusCode {
    StatusCode::from_u16(status)
        .ok()
        .filter(|s| s.is_client_error() || s.is_server_error())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<IntegrationError> for AppError {
    fn from(err: IntegrationError) -> Self {
        match err {
            IntegrationError::ProviderError(_)
            | IntegrationError::MalformedCallback { .. }
            | IntegrationError::StateMismatch
            | IntegrationError::CredentialsNotFound
            | IntegrationError::MissingAccessToken
            | IntegrationError::MalformedCredentials(_)
            | IntegrationError::MissingIdentifier(_) => AppError::BadRequest(err.to_string()),
            IntegrationError::TokenExchangeFailed { status, .. }
            | IntegrationError::UpstreamFetchFailed { status, .. } => {
                AppError::Upstream(upstream_status(status), err.to_string())
            }
            IntegrationError::InvalidProviderResponse(_)
            | IntegrationError::Http(_)
            | IntegrationError::Store(_)
            | IntegrationError::Serialization(_) => {
                error!(error = %err, "Unexpected integration failure");
                AppError::ServerError(format!("An unexpected error occurred: {}", err))
            }
        }
    }
}

/// Shared application state for the HubSpot endpoints
#[derive(Clone)]
pub struct HubSpotAppState {
    pub integration: HubSpotIntegration,
}

/// Form body naming the org/user pair
#[derive(Debug, Deserialize)]
pub struct IdentityForm {
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub org_id: String,
}

/// Form body carrying serialized credentials
#[derive(Debug, Deserialize)]
pub struct ItemsForm {
    #[serde(default)]
    pub credentials: String,
}

/// Create HubSpot integration router
pub fn create_hubspot_router(state: HubSpotAppState) -> Router {
    Router::new()
        .route("/integrations/hubspot/authorize", post(authorize))
        .route("/integrations/hubspot/oauth2callback", get(oauth2_callback))
        .route("/integrations/hubspot/credentials", post(get_credentials))
        .route("/integrations/hubspot/get_hubspot_items", post(get_items))
        .with_state(Arc::new(state))
}

/// POST /integrations/hubspot/authorize
async fn authorize(
    State(state): State<Arc<HubSpotAppState>>,
    Form(form): Form<IdentityForm>,
) -> Result<Json<String>, AppError> {
    let url = state
        .integration
        .authorize(&form.user_id, &form.org_id)
        .await?;

    info!(user_id = %form.user_id, org_id = %form.org_id, "Authorization started");
    Ok(Json(url))
}

/// GET /integrations/hubspot/oauth2callback
async fn oauth2_callback(
    State(state): State<Arc<HubSpotAppState>>,
    Query(params): Query<CallbackParams>,
) -> Result<Html<&'static str>, AppError> {
    state
        .integration
        .oauth2_callback(params)
        .await
        .map_err(|e| {
            warn!(error = %e, "OAuth callback rejected");
            AppError::from(e)
        })?;

    Ok(Html(CLOSE_WINDOW_HTML))
}

/// POST /integrations/hubspot/credentials
async fn get_credentials(
    State(state): State<Arc<HubSpotAppState>>,
    Form(form): Form<IdentityForm>,
) -> Result<Json<Credentials>, AppError> {
    let credentials = state
        .integration
        .get_credentials(&form.user_id, &form.org_id)
        .await?;
    Ok(Json(credentials))
}

/// POST /integrations/hubspot/get_hubspot_items
async fn get_items(
    State(state): State<Arc<HubSpotAppState>>,
    Form(form): Form<ItemsForm>,
) -> Result<Json<Vec<IntegrationItem>>, AppError> {
    let items = state
        .integration
        .get_items_from_json(&form.credentials)
        .await?;
    Ok(Json(items))
}
