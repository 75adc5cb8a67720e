use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use validator::Validate;

/// Machine status as shown on the status board
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MachineStatus {
    Running,
    Idle,
    Down,
    Maintenance,
    Offline,
}

/// A machine on the shop floor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    pub id: String,
    pub name: String,
    pub kind: String,
    pub location: String,
    pub status: MachineStatus,
    /// Utilization over the current shift, 0.0 - 1.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub utilization: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_maintenance: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_maintenance: Option<DateTime<Utc>>,
}

impl Machine {
    pub fn is_down(&self) -> bool {
        self.status == MachineStatus::Down
    }

    /// Whether scheduled maintenance is past due at `now`
    pub fn maintenance_overdue(&self, now: DateTime<Utc>) -> bool {
        self.next_maintenance.map_or(false, |due| due < now)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMachineStatusRequest {
    pub status: MachineStatus,
    #[validate(length(max = 500))]
    pub note: Option<String>,
}
