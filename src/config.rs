use std::env;

/// Base address used when `SIGNALS_API_BASE_URL` is not set.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8000";

/// Environment variable selecting the backend base address.
pub const API_BASE_URL_VAR: &str = "SIGNALS_API_BASE_URL";

/// Console configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Backend base address, without a trailing slash.
    pub api_base_url: String,
}

impl Config {
    /// Build a configuration pointing at the given base address.
    pub fn new(api_base_url: impl Into<String>) -> Self {
        let api_base_url = api_base_url.into();
        Self {
            api_base_url: api_base_url.trim().trim_end_matches('/').to_string(),
        }
    }

    /// Load configuration from environment variables (and `.env`, if present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let api_base_url = env::var(API_BASE_URL_VAR)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_API_BASE_URL.to_string());

        Self::new(api_base_url)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE_URL)
    }
}
