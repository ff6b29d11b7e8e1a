//! Instrument catalogue types.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Exchange used when the form leaves it blank.
pub const DEFAULT_EXCHANGE: &str = "NSE";

/// Tick size used when the form leaves it blank.
pub const DEFAULT_TICK_SIZE: f64 = 0.05;

/// Market segment of an instrument.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Segment {
    #[default]
    #[serde(rename = "EQ")]
    Equity,
    #[serde(rename = "FUT")]
    Futures,
    #[serde(rename = "OPT")]
    Options,
}

impl Segment {
    pub fn code(&self) -> &'static str {
        match self {
            Segment::Equity => "EQ",
            Segment::Futures => "FUT",
            Segment::Options => "OPT",
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Segment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "EQ" => Ok(Segment::Equity),
            "FUT" => Ok(Segment::Futures),
            "OPT" => Ok(Segment::Options),
            other => Err(format!("Unknown segment: {}", other)),
        }
    }
}

/// A tradable instrument as returned by the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Instrument {
    pub symbol: String,
    pub exchange: String,
    #[serde(default)]
    pub segment: Segment,
    pub lot_size: Option<i64>,
    pub tick_size: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub option_type: Option<String>,
}

/// Body of an instrument-creation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewInstrument {
    pub symbol: String,
    pub exchange: String,
    pub segment: Segment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lot_size: Option<i64>,
    pub tick_size: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub strike: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub option_type: Option<String>,
}

/// Raw instrument form fields, as typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstrumentForm {
    pub symbol: String,
    pub exchange: String,
    pub segment: String,
    pub lot_size: String,
    pub tick_size: String,
    /// `YYYY-MM-DD`
    pub expiry: String,
    pub strike: String,
    pub option_type: String,
}

/// Whether the catalogue contains the given symbol.
pub fn contains_symbol(catalogue: &[Instrument], symbol: &str) -> bool {
    catalogue.iter().any(|i| i.symbol == symbol)
}
