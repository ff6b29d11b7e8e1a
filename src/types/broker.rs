//! Broker credential types.
//!
//! Secrets only ever travel client -> server. The server acknowledges them
//! with presence flags and never echoes them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::Zeroize;

/// Raw credential form fields.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CredentialsForm {
    pub api_key: String,
    pub client_code: String,
    pub auth_token: String,
    pub totp_secret: String,
}

impl CredentialsForm {
    /// Wipe both secret fields, leaving them as empty strings.
    pub fn clear_secrets(&mut self) {
        self.auth_token.zeroize();
        self.totp_secret.zeroize();
    }
}

impl fmt::Debug for CredentialsForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsForm")
            .field("api_key", &self.api_key)
            .field("client_code", &self.client_code)
            .field("auth_token", &redacted(&self.auth_token))
            .field("totp_secret", &redacted(&self.totp_secret))
            .finish()
    }
}

/// Body of a credential save.
#[derive(Clone, PartialEq, Eq, Serialize)]
pub struct CredentialsPayload {
    pub api_key: String,
    pub client_code: String,
    pub auth_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub totp_secret: Option<String>,
}

impl fmt::Debug for CredentialsPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialsPayload")
            .field("api_key", &self.api_key)
            .field("client_code", &self.client_code)
            .field("auth_token", &redacted(&self.auth_token))
            .field("totp_secret", &self.totp_secret.as_deref().map(redacted))
            .finish()
    }
}

impl Drop for CredentialsPayload {
    fn drop(&mut self) {
        self.auth_token.zeroize();
        if let Some(secret) = self.totp_secret.as_mut() {
            secret.zeroize();
        }
    }
}

/// Server-side view of stored credentials.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CredentialsSummary {
    pub api_key: String,
    pub client_code: String,
    pub has_auth_token: bool,
    pub has_totp_secret: bool,
    #[serde(with = "crate::types::timestamp")]
    pub updated_at: DateTime<Utc>,
}

/// Result of validating the stored credentials against the broker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BrokerStatus {
    #[serde(default = "default_broker")]
    pub broker: String,
    pub connected: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default, with = "crate::types::timestamp::option")]
    pub updated_at: Option<DateTime<Utc>>,
}

fn default_broker() -> String {
    "motilal".to_string()
}

fn redacted(value: &str) -> &'static str {
    if value.is_empty() {
        ""
    } else {
        "<redacted>"
    }
}
