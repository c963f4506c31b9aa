// Configuration (TOML file + environment overlay)
pub mod config;

// Key-value store for OAuth state and credentials
pub mod store;

// Third-party integrations
pub mod integrations;

// HTTP API
pub mod api;
