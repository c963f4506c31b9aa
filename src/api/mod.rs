// HTTP API

pub mod hubspot;

pub use hubspot::{create_hubspot_router, HubSpotAppState, CLOSE_WINDOW_HTML};

use anyhow::{Context, Result};
use axum::http::{HeaderValue, Method};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};

/// Full application router: integration routes plus CORS for the front-end origin.
pub fn create_app(state: HubSpotAppState, cors_allowed_origin: &str) -> Result<Router> {
    let origin: HeaderValue = cors_allowed_origin
        .parse()
        .with_context(|| format!("Invalid CORS origin '{}'", cors_allowed_origin))?;

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(Any);

    Ok(create_hubspot_router(state).layer(cors))
}
