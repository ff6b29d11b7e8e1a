//! Backtest request/response types.

use chrono::{DateTime, Duration, Local, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

/// Initial capital used when the form leaves it blank.
pub const DEFAULT_INITIAL_CAPITAL: f64 = 1_000_000.0;

/// Length of the default backtest window.
pub const DEFAULT_WINDOW_DAYS: i64 = 60;

/// Strategy preselected in a fresh form.
pub const DEFAULT_STRATEGY_ID: &str = "nifty-test";

/// Format of a `datetime-local` input value.
pub const LOCAL_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BacktestRequest {
    pub strategy_id: String,
    pub symbols: Vec<String>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub initial_capital: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub total_return: f64,
    pub final_equity: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub backtest_id: String,
    pub metrics: BacktestMetrics,
}

impl BacktestResult {
    /// Total return expressed in percent.
    pub fn return_pct(&self) -> f64 {
        self.metrics.total_return * 100.0
    }
}

/// Raw backtest form fields. `symbols` is a comma separated list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BacktestForm {
    pub strategy_id: String,
    pub symbols: String,
    pub start: String,
    pub end: String,
    pub initial_capital: String,
}

impl BacktestForm {
    /// A form covering the default window ending at `now` (local wall time).
    pub fn ending_at(now: NaiveDateTime) -> Self {
        let start = now - Duration::days(DEFAULT_WINDOW_DAYS);
        Self {
            strategy_id: DEFAULT_STRATEGY_ID.to_string(),
            symbols: String::new(),
            start: start.format(LOCAL_DATETIME_FORMAT).to_string(),
            end: now.format(LOCAL_DATETIME_FORMAT).to_string(),
            initial_capital: String::new(),
        }
    }
}

impl Default for BacktestForm {
    fn default() -> Self {
        Self::ending_at(Local::now().naive_local())
    }
}
