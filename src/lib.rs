//! Signals Console - request orchestration for the Project Signals trading backend.
//!
//! Turns raw form input into validated API calls, tracks each call's lifecycle
//! and refreshes the data a successful mutation invalidates.

pub mod client;
pub mod config;
pub mod error;
pub mod services;
pub mod types;
