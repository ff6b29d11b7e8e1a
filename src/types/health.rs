use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Backend liveness response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(with = "crate::types::timestamp")]
    pub timestamp: DateTime<Utc>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}
