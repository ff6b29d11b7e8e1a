//! Typed client for the Project Signals HTTP API.

use super::transport::{HttpRequest, ReqwestTransport, Transport};
use crate::config::Config;
use crate::error::ApiError;
use crate::types::{
    AccountSnapshot, BacktestRequest, BacktestResult, BrokerStatus, CredentialsPayload,
    CredentialsSummary, HealthStatus, Instrument, NewInstrument, OrderRequest, OrderResult,
    WebhookAck, WebhookDispatch,
};
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, warn};

pub const ACCOUNT_PATH: &str = "/api/v1/accounts/primary";
pub const INSTRUMENTS_PATH: &str = "/api/v1/instruments/";
pub const NIFTY100_REFRESH_PATH: &str = "/api/v1/instruments/refresh/nifty100";
pub const ORDERS_PATH: &str = "/api/v1/orders/";
pub const BACKTESTS_PATH: &str = "/api/v1/backtests/";
pub const MOTILAL_PATH: &str = "/api/v1/brokers/motilal";
pub const MOTILAL_STATUS_PATH: &str = "/api/v1/brokers/motilal/status";
pub const WEBHOOKS_PATH: &str = "/api/v1/webhooks/";
pub const HEALTH_PATH: &str = "/api/v1/health/ping";

const NO_CONTENT: u16 = 204;

/// API client bound to one backend base address.
pub struct ApiClient<T = ReqwestTransport> {
    transport: T,
    base_url: String,
}

impl ApiClient<ReqwestTransport> {
    /// Create a client that talks HTTP through `reqwest`.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config, ReqwestTransport::new())
    }
}

impl<T: Transport> ApiClient<T> {
    pub fn new(config: &Config, transport: T) -> Self {
        Self {
            transport,
            base_url: config.api_base_url.clone(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Absolute URL for a path relative to the base address.
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Issue one request and normalize the response.
    ///
    /// `Content-Type: application/json` is always sent; caller headers win on
    /// conflict. A 204 yields an empty object, any other 2xx yields the decoded
    /// body, and everything else yields [`ApiError::Status`] with the raw body.
    pub async fn request(
        &self,
        path: &str,
        method: Method,
        body: Option<&Value>,
        headers: Option<&HeaderMap>,
    ) -> Result<Value, ApiError> {
        let mut merged = HeaderMap::new();
        merged.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(extra) = headers {
            for name in extra.keys() {
                merged.remove(name);
            }
            for (name, value) in extra {
                merged.append(name.clone(), value.clone());
            }
        }

        let request = HttpRequest {
            method,
            url: self.url(path),
            headers: merged,
            body: body.map(Value::to_string),
        };
        let method = request.method.clone();

        let response = self.transport.send(request).await.map_err(|e| {
            warn!("{} {} failed: {}", method, path, e);
            e
        })?;

        if !response.is_success() {
            warn!("{} {} returned {}", method, path, response.status);
            return Err(ApiError::Status {
                status: response.status,
                status_text: response.status_text,
                body: response.body,
            });
        }

        debug!("{} {} returned {}", method, path, response.status);
        if response.status == NO_CONTENT {
            return Ok(Value::Object(Map::new()));
        }

        serde_json::from_str(&response.body).map_err(|e| ApiError::Parse(e.to_string()))
    }

    async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let value = self.request(path, Method::GET, None, None).await?;
        decode(value)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
        headers: Option<&HeaderMap>,
    ) -> Result<R, ApiError> {
        let body = body.map(encode).transpose()?;
        let value = self
            .request(path, Method::POST, body.as_ref(), headers)
            .await?;
        decode(value)
    }

    // ========== Accounts ==========

    pub async fn load_account(&self) -> Result<AccountSnapshot, ApiError> {
        self.get(ACCOUNT_PATH).await
    }

    // ========== Instruments ==========

    pub async fn list_instruments(&self) -> Result<Vec<Instrument>, ApiError> {
        self.get(INSTRUMENTS_PATH).await
    }

    pub async fn create_instrument(&self, payload: &NewInstrument) -> Result<Instrument, ApiError> {
        self.post(INSTRUMENTS_PATH, Some(payload), None).await
    }

    /// Ask the backend to pull the NIFTY 100 universe from the broker.
    pub async fn refresh_nifty100(&self) -> Result<Vec<Instrument>, ApiError> {
        self.post::<Value, _>(NIFTY100_REFRESH_PATH, None, None).await
    }

    // ========== Orders & backtests ==========

    pub async fn submit_order(&self, order: &OrderRequest) -> Result<OrderResult, ApiError> {
        self.post(ORDERS_PATH, Some(order), None).await
    }

    /// Accepted runs come back as 202 with the result inline.
    pub async fn run_backtest(&self, request: &BacktestRequest) -> Result<BacktestResult, ApiError> {
        self.post(BACKTESTS_PATH, Some(request), None).await
    }

    // ========== Broker ==========

    /// Stored credential summary, or `None` when nothing is saved yet.
    pub async fn broker_credentials(&self) -> Result<Option<CredentialsSummary>, ApiError> {
        let value = self.request(MOTILAL_PATH, Method::GET, None, None).await?;
        if is_empty_payload(&value) {
            return Ok(None);
        }
        decode(value).map(Some)
    }

    pub async fn save_broker_credentials(
        &self,
        payload: &CredentialsPayload,
    ) -> Result<CredentialsSummary, ApiError> {
        self.post(MOTILAL_PATH, Some(payload), None).await
    }

    pub async fn broker_status(&self) -> Result<BrokerStatus, ApiError> {
        self.get(MOTILAL_STATUS_PATH).await
    }

    // ========== Webhooks & health ==========

    pub async fn dispatch_webhook(&self, dispatch: &WebhookDispatch) -> Result<WebhookAck, ApiError> {
        let path = format!("{}{}", WEBHOOKS_PATH, dispatch.provider.path_segment());
        let value = self
            .request(&path, Method::POST, Some(&dispatch.payload), Some(&dispatch.headers))
            .await?;
        decode(value)
    }

    pub async fn ping(&self) -> Result<HealthStatus, ApiError> {
        self.get(HEALTH_PATH).await
    }
}

fn encode<B: Serialize>(body: &B) -> Result<Value, ApiError> {
    serde_json::to_value(body).map_err(|e| ApiError::Parse(e.to_string()))
}

fn decode<R: DeserializeOwned>(value: Value) -> Result<R, ApiError> {
    serde_json::from_value(value).map_err(|e| ApiError::Parse(e.to_string()))
}

fn is_empty_payload(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}
