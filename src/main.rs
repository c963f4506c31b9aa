use anyhow::{Context, Result};
use hubspot_link::api::{create_app, HubSpotAppState};
use hubspot_link::config::{load_config, HubLinkConfig};
use hubspot_link::integrations::hubspot::HubSpotIntegration;
use hubspot_link::store::{build_store, run_store_cleanup};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing subscriber
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "hubspot_link=info".into()),
        )
        .init();

    info!("HubSpot link starting...");

    // File config is optional; environment overrides it
    let mut config = match std::env::var("HUBLINK_CONFIG") {
        Ok(path) => load_config(&path)?,
        Err(_) => HubLinkConfig::default(),
    };
    config.apply_env()?;
    config.validate().context("Invalid configuration")?;

    info!(
        bind_address = %config.server.bind_address,
        backend = ?config.store.backend,
        state_ttl_seconds = config.store.state_ttl_seconds,
        credentials_ttl_seconds = config.store.credentials_ttl_seconds,
        "Configuration loaded"
    );

    let built = build_store(&config.store)
        .await
        .context("Failed to initialize key-value store")?;
    info!("Key-value store initialized");

    let cleanup_handle = built.memory.map(|memory| {
        tokio::spawn(run_store_cleanup(
            memory,
            config.store.cleanup_interval_seconds,
        ))
    });

    let integration = HubSpotIntegration::new(&config, built.store)?;
    let app = create_app(
        HubSpotAppState { integration },
        &config.server.cors_allowed_origin,
    )?;

    let listener = tokio::net::TcpListener::bind(&config.server.bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_address))?;
    info!(address = %config.server.bind_address, "HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl_c signal");
            }
            info!("Shutdown signal received");
        })
        .await
        .context("HTTP server error")?;

    if let Some(handle) = cleanup_handle {
        handle.abort();
    }
    info!("HubSpot link stopped");

    Ok(())
}
