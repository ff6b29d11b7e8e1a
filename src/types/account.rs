use serde::{Deserialize, Serialize};

/// An open position inside an account snapshot. Negative quantity is short.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: i64,
    pub avg_price: f64,
}

impl Position {
    pub fn is_short(&self) -> bool {
        self.quantity < 0
    }

    /// Absolute cost basis of the position.
    pub fn notional(&self) -> f64 {
        self.quantity.unsigned_abs() as f64 * self.avg_price
    }
}

/// Paper account state. Always replaced wholesale on refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub cash_balance: f64,
    pub margin_used: f64,
    pub positions: Vec<Position>,
}

impl AccountSnapshot {
    /// Look up the position held in a symbol.
    pub fn position(&self, symbol: &str) -> Option<&Position> {
        self.positions.iter().find(|p| p.symbol == symbol)
    }
}
