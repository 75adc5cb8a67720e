use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Output reported by a machine for one production interval
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductionEvent {
    pub id: String,
    pub machine_id: String,
    pub occurred_at: DateTime<Utc>,
    pub produced: u32,
    pub scrapped: u32,
}
