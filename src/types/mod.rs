pub mod account;
pub mod backtest;
pub mod broker;
pub mod health;
pub mod instrument;
pub mod operation;
pub mod order;
pub mod timestamp;
pub mod webhook;

pub use account::*;
pub use backtest::*;
pub use broker::*;
pub use health::*;
pub use instrument::*;
pub use operation::*;
pub use order::*;
pub use webhook::*;
