//! Webhook replay types.

use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderName};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Alert provider a webhook payload is replayed as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WebhookProvider {
    #[default]
    Chartink,
    TradingView,
}

impl WebhookProvider {
    /// Path segment under `/api/v1/webhooks/`.
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::Chartink => "chartink",
            Self::TradingView => "tradingview",
        }
    }

    /// Header carrying the provider's shared token.
    pub fn token_header(&self) -> HeaderName {
        match self {
            Self::Chartink => HeaderName::from_static("x-chartink-token"),
            Self::TradingView => HeaderName::from_static("x-tradingview-token"),
        }
    }
}

impl fmt::Display for WebhookProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

impl FromStr for WebhookProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chartink" => Ok(Self::Chartink),
            "tradingview" => Ok(Self::TradingView),
            other => Err(format!("Unknown webhook provider: {}", other)),
        }
    }
}

/// Raw webhook replay form.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WebhookForm {
    pub provider: WebhookProvider,
    /// JSON text as pasted by the user.
    pub payload: String,
    pub token: String,
}

/// A validated webhook replay, ready to send.
#[derive(Debug, Clone)]
pub struct WebhookDispatch {
    pub provider: WebhookProvider,
    pub payload: Value,
    /// Extra request headers; holds the provider token when one was given.
    pub headers: HeaderMap,
}

/// Backend acknowledgement of an ingested webhook.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookAck {
    pub status: String,
    #[serde(with = "crate::types::timestamp")]
    pub received_at: DateTime<Utc>,
}
