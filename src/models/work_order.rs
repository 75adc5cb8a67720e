use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

use crate::errors::ServiceError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkOrderStatus {
    Open,
    InProgress,
    OnHold,
    Completed,
    Cancelled,
}

impl WorkOrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }

    pub fn can_transition_to(self, next: WorkOrderStatus) -> bool {
        use WorkOrderStatus::*;
        matches!(
            (self, next),
            (Open, InProgress)
                | (Open, OnHold)
                | (Open, Cancelled)
                | (InProgress, OnHold)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
                | (OnHold, InProgress)
                | (OnHold, Cancelled)
        )
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum WorkOrderPriority {
    Low,
    Medium,
    High,
    Critical,
}

/// Maintenance or repair task, usually tied to a machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrder {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub machine_id: Option<String>,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: WorkOrderStatus,
    pub priority: WorkOrderPriority,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl WorkOrder {
    pub fn is_open(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_date.map_or(false, |due| due < now)
    }

    /// Move to `next`, stamping `completed_at` when the order completes.
    pub fn transition(&mut self, next: WorkOrderStatus, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "work order {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        self.status = next;
        if next == WorkOrderStatus::Completed {
            self.completed_at = Some(now);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateWorkOrderRequest {
    #[validate(length(min = 1, max = 200, message = "Title must be between 1 and 200 characters"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[serde(default)]
    pub machine_id: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: WorkOrderPriority,
    #[serde(default)]
    pub assigned_to: Option<String>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
}

fn default_priority() -> WorkOrderPriority {
    WorkOrderPriority::Medium
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateWorkOrderStatusRequest {
    pub status: WorkOrderStatus,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AssignWorkOrderRequest {
    #[validate(length(min = 1, max = 100))]
    pub assigned_to: String,
}
