//! Form validation and payload construction.
//!
//! One builder per submitting form. Rules are checked in order and the first
//! failure is returned. Nothing here performs I/O.

use crate::error::ValidationError;
use crate::types::{
    BacktestForm, BacktestRequest, CredentialsForm, CredentialsPayload, InstrumentForm,
    NewInstrument, OrderForm, OrderRequest, Segment, WebhookDispatch, WebhookForm,
    DEFAULT_EXCHANGE, DEFAULT_INITIAL_CAPITAL, DEFAULT_TICK_SIZE,
};
use chrono::{DateTime, Local, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::Value;

type Result<T> = std::result::Result<T, ValidationError>;

fn fail<T>(message: impl Into<String>) -> Result<T> {
    Err(ValidationError::new(message))
}

fn non_blank(raw: &str) -> Option<&str> {
    let trimmed = raw.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn positive_number(raw: &str, message: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => Ok(value),
        _ => fail(message),
    }
}

// ========== Instruments ==========

/// Build an instrument-creation payload.
///
/// The symbol is required and uppercased. Exchange, segment and tick size fall
/// back to `NSE`, `EQ` and `0.05`; blank optional fields are left out.
pub fn build_instrument(form: &InstrumentForm) -> Result<NewInstrument> {
    let Some(symbol) = non_blank(&form.symbol) else {
        return fail("Symbol is required");
    };

    let exchange = non_blank(&form.exchange)
        .map(str::to_ascii_uppercase)
        .unwrap_or_else(|| DEFAULT_EXCHANGE.to_string());

    let segment = match non_blank(&form.segment) {
        Some(raw) => raw
            .parse::<Segment>()
            .or_else(|_| fail("Segment must be one of EQ, FUT, OPT"))?,
        None => Segment::default(),
    };

    let lot_size = match non_blank(&form.lot_size) {
        Some(raw) => Some(
            raw.parse::<i64>()
                .or_else(|_| fail("Lot size must be a whole number"))?,
        ),
        None => None,
    };

    let tick_size = match non_blank(&form.tick_size) {
        Some(raw) => positive_number(raw, "Tick size must be a positive number")?,
        None => DEFAULT_TICK_SIZE,
    };

    let expiry = match non_blank(&form.expiry) {
        Some(raw) => Some(
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .or_else(|_| fail("Expiry must be a date (YYYY-MM-DD)"))?,
        ),
        None => None,
    };

    let strike = match non_blank(&form.strike) {
        Some(raw) => Some(positive_number(raw, "Strike must be a positive number")?),
        None => None,
    };

    Ok(NewInstrument {
        symbol: symbol.to_uppercase(),
        exchange,
        segment,
        lot_size,
        tick_size,
        expiry,
        strike,
        option_type: non_blank(&form.option_type).map(str::to_ascii_uppercase),
    })
}

// ========== Orders ==========

/// Build an order submission. The price is only sent when one was entered.
pub fn build_order(form: &OrderForm) -> Result<OrderRequest> {
    let Some(symbol) = non_blank(&form.symbol) else {
        return fail("Select a symbol before placing an order");
    };

    let quantity = positive_number(form.quantity.trim(), "Quantity must be a positive number")?;
    if quantity.fract() != 0.0 || quantity > u64::MAX as f64 {
        return fail("Quantity must be a whole number");
    }

    let price = match non_blank(&form.price) {
        Some(raw) => Some(positive_number(raw, "Price must be a positive number")?),
        None => None,
    };

    Ok(OrderRequest {
        symbol: symbol.to_string(),
        side: form.side,
        order_type: form.order_type,
        quantity: quantity as u64,
        price,
        strategy_id: non_blank(&form.strategy_id).map(str::to_string),
    })
}

// ========== Backtests ==========

/// Split a comma separated symbol list, trimming entries and dropping empty
/// ones and repeats. Order of first appearance is kept.
pub fn normalize_symbols(raw: &str) -> Vec<String> {
    let mut symbols: Vec<String> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if !symbols.iter().any(|s| s == entry) {
            symbols.push(entry.to_string());
        }
    }
    symbols
}

/// Build a backtest request, reading dates in the machine's local timezone.
pub fn build_backtest_request(form: &BacktestForm) -> Result<BacktestRequest> {
    build_backtest_request_in(form, &Local)
}

/// Build a backtest request, reading dates as wall time in `tz`.
///
/// `start` is not required to precede `end`; the backend decides.
pub fn build_backtest_request_in<Tz: TimeZone>(form: &BacktestForm, tz: &Tz) -> Result<BacktestRequest> {
    if non_blank(&form.symbols).is_none() {
        return fail("Enter at least one symbol");
    }
    let symbols = normalize_symbols(&form.symbols);
    if symbols.is_empty() {
        return fail("Enter at least one symbol");
    }

    let start = parse_local_datetime(&form.start, "Start", tz)?;
    let end = parse_local_datetime(&form.end, "End", tz)?;

    let initial_capital = match non_blank(&form.initial_capital) {
        Some(raw) => positive_number(raw, "Initial capital must be a positive number")?,
        None => DEFAULT_INITIAL_CAPITAL,
    };

    Ok(BacktestRequest {
        strategy_id: form.strategy_id.trim().to_string(),
        symbols,
        start,
        end,
        initial_capital,
    })
}

/// Parse a `datetime-local` value (`YYYY-MM-DDTHH:MM[:SS]`) as wall time in
/// `tz`. Ambiguous wall times resolve to the earlier instant.
pub fn parse_local_datetime<Tz: TimeZone>(raw: &str, field: &str, tz: &Tz) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M"))
        .or_else(|_| fail(format!("{} must be a date and time (YYYY-MM-DDTHH:MM)", field)))?;

    match tz.from_local_datetime(&naive) {
        LocalResult::Single(ts) => Ok(ts.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => fail(format!("{} does not exist in the local timezone", field)),
    }
}

// ========== Webhooks ==========

/// Parse the pasted payload and attach the provider token header when given.
/// JSON errors are surfaced verbatim. The payload must be a JSON object.
pub fn build_webhook(form: &WebhookForm) -> Result<WebhookDispatch> {
    let payload: Value =
        serde_json::from_str(&form.payload).map_err(|e| ValidationError::new(e.to_string()))?;
    if !payload.is_object() {
        return fail("Payload must be a JSON object");
    }

    let mut headers = HeaderMap::new();
    if let Some(token) = non_blank(&form.token) {
        let mut value = HeaderValue::from_str(token)
            .or_else(|_| fail("Token contains characters not allowed in a header"))?;
        value.set_sensitive(true);
        headers.insert(form.provider.token_header(), value);
    }

    Ok(WebhookDispatch {
        provider: form.provider,
        payload,
        headers,
    })
}

// ========== Broker credentials ==========

pub fn build_credentials(form: &CredentialsForm) -> Result<CredentialsPayload> {
    let Some(api_key) = non_blank(&form.api_key) else {
        return fail("API key is required");
    };
    let Some(client_code) = non_blank(&form.client_code) else {
        return fail("Client code is required");
    };
    let Some(auth_token) = non_blank(&form.auth_token) else {
        return fail("Auth token is required");
    };

    Ok(CredentialsPayload {
        api_key: api_key.to_string(),
        client_code: client_code.to_string(),
        auth_token: auth_token.to_string(),
        totp_secret: non_blank(&form.totp_secret).map(str::to_string),
    })
}
