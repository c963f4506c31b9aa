use anyhow::{bail, Context, Result};
use serde::Deserialize;

/// Complete service configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HubLinkConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub hubspot: HubSpotConfig,
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
    /// Origin of the front-end that opens the OAuth popup
    #[serde(default = "default_cors_allowed_origin")]
    pub cors_allowed_origin: String,
}

fn default_bind_address() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_cors_allowed_origin() -> String {
    "http://localhost:3000".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            cors_allowed_origin: default_cors_allowed_origin(),
        }
    }
}

/// HubSpot OAuth application and API endpoints
#[derive(Clone, Deserialize)]
pub struct HubSpotConfig {
    /// Client ID (no default, must be configured)
    #[serde(default)]
    pub client_id: String,

    /// Client secret (no default, must be configured)
    #[serde(default)]
    pub client_secret: String,

    /// Redirect URI registered with the HubSpot app
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,

    /// Requested OAuth scopes
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,

    /// OAuth authorization endpoint URL
    #[serde(default = "default_authorize_url")]
    pub authorize_url: String,

    /// OAuth token exchange endpoint URL
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Base URL for CRM API calls
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
}

fn default_redirect_uri() -> String {
    "http://localhost:8000/integrations/hubspot/oauth2callback".to_string()
}

fn default_scopes() -> Vec<String> {
    [
        "crm.objects.contacts.read",
        "crm.objects.deals.read",
        "crm.objects.contacts.write",
        "oauth",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_authorize_url() -> String {
    "https://app.hubspot.com/oauth/authorize".to_string()
}

fn default_token_url() -> String {
    "https://api.hubapi.com/oauth/v1/token".to_string()
}

fn default_api_base_url() -> String {
    "https://api.hubapi.com".to_string()
}

impl Default for HubSpotConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: default_redirect_uri(),
            scopes: default_scopes(),
            authorize_url: default_authorize_url(),
            token_url: default_token_url(),
            api_base_url: default_api_base_url(),
        }
    }
}

// Keeps the client secret out of logs.
impl std::fmt::Debug for HubSpotConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HubSpotConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .field("scopes", &self.scopes)
            .field("authorize_url", &self.authorize_url)
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .finish()
    }
}

/// Which key-value backend holds OAuth state and credentials
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Redis,
}

impl std::str::FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "redis" => Ok(StoreBackend::Redis),
            other => bail!("Unknown store backend '{}'", other),
        }
    }
}

/// Key-value store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_backend")]
    pub backend: StoreBackend,
    #[serde(default = "default_redis_url")]
    pub redis_url: String,
    /// Prepended to every key (redis only)
    #[serde(default)]
    pub key_prefix: String,
    /// Lifetime of a pending OAuth state record
    #[serde(default = "default_ttl")]
    pub state_ttl_seconds: u64,
    /// Lifetime of a stored credential record
    #[serde(default = "default_ttl")]
    pub credentials_ttl_seconds: u64,
    /// How often the memory backend purges expired entries
    #[serde(default = "default_cleanup_interval")]
    pub cleanup_interval_seconds: u64,
}

fn default_backend() -> StoreBackend {
    StoreBackend::Memory
}

fn default_redis_url() -> String {
    "redis://127.0.0.1:6379".to_string()
}

fn default_ttl() -> u64 {
    3600
}

fn default_cleanup_interval() -> u64 {
    60
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            redis_url: default_redis_url(),
            key_prefix: String::new(),
            state_ttl_seconds: default_ttl(),
            credentials_ttl_seconds: default_ttl(),
            cleanup_interval_seconds: default_cleanup_interval(),
        }
    }
}

impl HubLinkConfig {
    /// Overlay `HUBLINK_*` environment variables on top of the loaded values.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_vars(|name| std::env::var(name).ok())
    }

    fn apply_vars<F>(&mut self, var: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = var("HUBLINK_BIND_ADDRESS") {
            self.server.bind_address = v;
        }
        if let Some(v) = var("HUBLINK_CORS_ALLOWED_ORIGIN") {
            self.server.cors_allowed_origin = v;
        }
        if let Some(v) = var("HUBLINK_HUBSPOT_CLIENT_ID") {
            self.hubspot.client_id = v;
        }
        if let Some(v) = var("HUBLINK_HUBSPOT_CLIENT_SECRET") {
            self.hubspot.client_secret = v;
        }
        if let Some(v) = var("HUBLINK_HUBSPOT_REDIRECT_URI") {
            self.hubspot.redirect_uri = v;
        }
        if let Some(v) = var("HUBLINK_STORE_BACKEND") {
            self.store.backend = v.parse()?;
        }
        if let Some(v) = var("HUBLINK_REDIS_URL") {
            self.store.redis_url = v;
        }
        if let Some(v) = var("HUBLINK_STATE_TTL_SECONDS") {
            self.store.state_ttl_seconds = v
                .parse()
                .context("HUBLINK_STATE_TTL_SECONDS must be a number of seconds")?;
        }
        if let Some(v) = var("HUBLINK_CREDENTIALS_TTL_SECONDS") {
            self.store.credentials_ttl_seconds = v
                .parse()
                .context("HUBLINK_CREDENTIALS_TTL_SECONDS must be a number of seconds")?;
        }
        Ok(())
    }

    /// Reject configurations the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.hubspot.client_id.trim().is_empty() {
            bail!("hubspot.client_id is not set (HUBLINK_HUBSPOT_CLIENT_ID)");
        }
        if self.hubspot.client_secret.trim().is_empty() {
            bail!("hubspot.client_secret is not set (HUBLINK_HUBSPOT_CLIENT_SECRET)");
        }
        if self.hubspot.scopes.is_empty() {
            bail!("hubspot.scopes must name at least one scope");
        }
        if self.store.state_ttl_seconds == 0 || self.store.credentials_ttl_seconds == 0 {
            bail!("store TTLs must be greater than zero");
        }
        Ok(())
    }
}

/// Load configuration from TOML file
pub fn load_config(path: &str) -> Result<HubLinkConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file {}", path))?;
    let config: HubLinkConfig =
        toml::from_str(&contents).with_context(|| format!("Failed to parse {}", path))?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = HubLinkConfig::default();
        assert_eq!(config.server.bind_address, "0.0.0.0:8000");
        assert_eq!(config.store.backend, StoreBackend::Memory);
        assert_eq!(config.store.state_ttl_seconds, 3600);
        assert_eq!(config.store.credentials_ttl_seconds, 3600);
        assert_eq!(config.hubspot.scopes.len(), 4);
        assert_eq!(
            config.hubspot.redirect_uri,
            "http://localhost:8000/integrations/hubspot/oauth2callback"
        );
        assert!(config.hubspot.client_id.is_empty());
    }

    #[test]
    fn test_config_deserialization() {
        let toml = r#"
            [server]
            bind_address = "127.0.0.1:9000"

            [hubspot]
            client_id = "app-id"
            client_secret = "app-secret"
            scopes = ["crm.objects.contacts.read"]

            [store]
            backend = "redis"
            redis_url = "redis://cache:6379"
            state_ttl_seconds = 600
            credentials_ttl_seconds = 1800
        "#;

        let config: HubLinkConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.server.bind_address, "127.0.0.1:9000");
        assert_eq!(config.hubspot.client_id, "app-id");
        assert_eq!(config.hubspot.scopes, vec!["crm.objects.contacts.read"]);
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.state_ttl_seconds, 600);
        assert_eq!(config.store.credentials_ttl_seconds, 1800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_config() {
        let toml = r#"
            [store]
            credentials_ttl_seconds = 7200
        "#;

        let config: HubLinkConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.store.credentials_ttl_seconds, 7200);
        assert_eq!(config.store.state_ttl_seconds, 3600); // Default
        assert_eq!(config.hubspot.token_url, "https://api.hubapi.com/oauth/v1/token");
    }

    #[test]
    fn test_env_overlay() {
        let vars: HashMap<&str, &str> = [
            ("HUBLINK_HUBSPOT_CLIENT_ID", "env-id"),
            ("HUBLINK_HUBSPOT_CLIENT_SECRET", "env-secret"),
            ("HUBLINK_STORE_BACKEND", "Redis"),
            ("HUBLINK_STATE_TTL_SECONDS", "300"),
        ]
        .into_iter()
        .collect();

        let mut config = HubLinkConfig::default();
        config
            .apply_vars(|name| vars.get(name).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.hubspot.client_id, "env-id");
        assert_eq!(config.hubspot.client_secret, "env-secret");
        assert_eq!(config.store.backend, StoreBackend::Redis);
        assert_eq!(config.store.state_ttl_seconds, 300);
        assert_eq!(config.store.credentials_ttl_seconds, 3600);
    }

    #[test]
    fn test_env_overlay_rejects_bad_ttl() {
        let mut config = HubLinkConfig::default();
        let result = config.apply_vars(|name| {
            (name == "HUBLINK_CREDENTIALS_TTL_SECONDS").then(|| "an hour".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_validate_requires_client_credentials() {
        let config = HubLinkConfig::default();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("client_id"));

        let mut config = HubLinkConfig::default();
        config.hubspot.client_id = "id".to_string();
        config.hubspot.client_secret = "secret".to_string();
        config.store.state_ttl_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let mut config = HubSpotConfig::default();
        config.client_secret = "super-secret".to_string();
        let rendered = format!("{:?}", config);
        assert!(!rendered.contains("super-secret"));
        assert!(rendered.contains("<redacted>"));
    }
}
