use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use validator::Validate;

use crate::errors::ServiceError;

/// Engineering change order status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum EcoStatus {
    Draft,
    InReview,
    Approved,
    Rejected,
    Implemented,
}

impl EcoStatus {
    pub fn can_transition_to(self, next: EcoStatus) -> bool {
        use EcoStatus::*;
        matches!(
            (self, next),
            (Draft, InReview)
                | (InReview, Approved)
                | (InReview, Rejected)
                | (Rejected, Draft)
                | (Approved, Implemented)
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Eco {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: EcoStatus,
    pub requested_by: String,
    #[serde(default)]
    pub affected_machines: Vec<String>,
    #[serde(default)]
    pub affected_documents: Vec<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submitted_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decided_at: Option<DateTime<Utc>>,
}

impl Eco {
    pub fn is_awaiting_review(&self) -> bool {
        self.status == EcoStatus::InReview
    }

    pub fn transition(&mut self, next: EcoStatus, now: DateTime<Utc>) -> Result<(), ServiceError> {
        if !self.status.can_transition_to(next) {
            return Err(ServiceError::InvalidStatus(format!(
                "ECO {} cannot move from {} to {}",
                self.id, self.status, next
            )));
        }
        match next {
            EcoStatus::InReview => self.submitted_at = Some(now),
            EcoStatus::Approved | EcoStatus::Rejected => self.decided_at = Some(now),
            EcoStatus::Draft => {
                self.submitted_at = None;
                self.decided_at = None;
            }
            EcoStatus::Implemented => {}
        }
        self.status = next;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEcoRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub description: Option<String>,
    #[serde(default)]
    pub affected_machines: Vec<String>,
    #[serde(default)]
    pub affected_documents: Vec<String>,
}
