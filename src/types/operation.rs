//! Lifecycle state of console operations.

use serde::Serialize;
use std::fmt;

/// Every operation the console can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationKind {
    LoadAccount,
    LoadInstruments,
    CreateInstrument,
    RefreshUniverse,
    SubmitOrder,
    RunBacktest,
    DispatchChartink,
    DispatchTradingView,
    LoadCredentials,
    SaveCredentials,
    CheckBrokerStatus,
    Ping,
}

impl OperationKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadAccount => "load_account",
            Self::LoadInstruments => "load_instruments",
            Self::CreateInstrument => "create_instrument",
            Self::RefreshUniverse => "refresh_universe",
            Self::SubmitOrder => "submit_order",
            Self::RunBacktest => "run_backtest",
            Self::DispatchChartink => "dispatch_chartink",
            Self::DispatchTradingView => "dispatch_tradingview",
            Self::LoadCredentials => "load_credentials",
            Self::SaveCredentials => "save_credentials",
            Self::CheckBrokerStatus => "check_broker_status",
            Self::Ping => "ping",
        }
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Coarse phase of an operation, without its payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Pending,
    Succeeded,
    Failed,
}

/// State of one operation. A value and an error message can never coexist.
#[derive(Debug, Clone, PartialEq)]
pub enum OperationState<T> {
    Idle,
    Pending,
    Succeeded(T),
    Failed(String),
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        Self::Idle
    }
}

impl<T> OperationState<T> {
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Pending => Phase::Pending,
            Self::Succeeded(_) => Phase::Succeeded,
            Self::Failed(_) => Phase::Failed,
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending)
    }

    /// Succeeded or failed.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded(_) | Self::Failed(_))
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Succeeded(value) => Some(value),
            _ => None,
        }
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            Self::Failed(message) => Some(message),
            _ => None,
        }
    }
}
