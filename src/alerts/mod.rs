//! Threshold alerts over dashboard snapshots.
//!
//! [`rules`] holds the pure rule functions, [`engine`] reconciles their
//! matches with the alerts already raised (dedup, dismiss, resolve).

pub mod engine;
pub mod rules;

pub use engine::{AlertEngine, RefreshOutcome};
pub use rules::{default_rules, evaluate_rules, AlertThresholds, Rule};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::models::{Eco, Machine, ProductionEvent, ShippingOrder, WorkOrder};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Entity ids an alert points at
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedEntities {
    #[serde(default)]
    pub machines: Vec<String>,
    #[serde(default)]
    pub work_orders: Vec<String>,
    #[serde(default)]
    pub shipping_orders: Vec<String>,
    #[serde(default)]
    pub ecos: Vec<String>,
}

/// What a single rule reports when it fires
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertMatch {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub related: RelatedEntities,
}

/// A raised alert tracked by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub title: String,
    pub message: String,
    pub severity: Severity,
    pub related: RelatedEntities,
    pub triggered_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub dismissed: bool,
}

impl Alert {
    fn raised(m: AlertMatch, at: DateTime<Utc>) -> Self {
        Self {
            id: m.id,
            title: m.title,
            message: m.message,
            severity: m.severity,
            related: m.related,
            triggered_at: at,
            updated_at: at,
            dismissed: false,
        }
    }
}

/// Collections an evaluation runs over, stamped with the time they were read
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    #[serde(default)]
    pub machines: Vec<Machine>,
    #[serde(default)]
    pub work_orders: Vec<WorkOrder>,
    #[serde(default)]
    pub shipping_orders: Vec<ShippingOrder>,
    #[serde(default)]
    pub ecos: Vec<Eco>,
    #[serde(default)]
    pub events: Vec<ProductionEvent>,
    #[serde(default = "Utc::now")]
    pub as_of: DateTime<Utc>,
}

impl Snapshot {
    pub fn empty(as_of: DateTime<Utc>) -> Self {
        Self {
            machines: Vec::new(),
            work_orders: Vec::new(),
            shipping_orders: Vec::new(),
            ecos: Vec::new(),
            events: Vec::new(),
            as_of,
        }
    }
}
