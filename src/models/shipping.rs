use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ShippingStatus {
    Pending,
    Picking,
    Packed,
    Shipped,
    Delivered,
    Cancelled,
}

impl ShippingStatus {
    /// Not yet handed to a carrier and not cancelled
    pub fn is_outstanding(self) -> bool {
        matches!(self, Self::Pending | Self::Picking | Self::Packed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingLine {
    pub part_number: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingOrder {
    pub id: String,
    pub customer: String,
    pub status: ShippingStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ship_by: Option<DateTime<Utc>>,
    #[serde(default)]
    pub items: Vec<ShippingLine>,
    pub created_at: DateTime<Utc>,
}

impl ShippingOrder {
    pub fn is_outstanding(&self) -> bool {
        self.status.is_outstanding()
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_outstanding() && self.ship_by.map_or(false, |ship_by| ship_by < now)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateShippingStatusRequest {
    pub status: ShippingStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DeliveryStatus {
    Scheduled,
    InTransit,
    Delivered,
    Exception,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Delivery {
    pub id: String,
    pub shipping_order_id: String,
    pub carrier: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracking_number: Option<String>,
    pub status: DeliveryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eta: Option<DateTime<Utc>>,
}

/// Whether enough of a part is on hand for a work order or shipment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartReadiness {
    pub part_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub work_order_id: Option<String>,
    pub required: u32,
    pub available: u32,
}

impl PartReadiness {
    pub fn is_ready(&self) -> bool {
        self.available >= self.required
    }

    pub fn shortfall(&self) -> u32 {
        self.required.saturating_sub(self.available)
    }
}

/// Readiness row with the derived flag, as served to the dashboard
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartReadinessView {
    #[serde(flatten)]
    pub readiness: PartReadiness,
    pub ready: bool,
    pub shortfall: u32,
}

impl From<PartReadiness> for PartReadinessView {
    fn from(readiness: PartReadiness) -> Self {
        let ready = readiness.is_ready();
        let shortfall = readiness.shortfall();
        Self {
            readiness,
            ready,
            shortfall,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn order(status: ShippingStatus, ship_by: Option<DateTime<Utc>>) -> ShippingOrder {
        ShippingOrder {
            id: "so-1".into(),
            customer: "Acme".into(),
            status,
            ship_by,
            items: vec![],
            created_at: Utc::now(),
        }
    }

    #[test]
    fn overdue_requires_outstanding_and_past_ship_by() {
        let now = Utc::now();
        let past = Some(now - Duration::days(1));
        assert!(order(ShippingStatus::Packed, past).is_overdue(now));
        assert!(!order(ShippingStatus::Shipped, past).is_overdue(now));
        assert!(!order(ShippingStatus::Pending, None).is_overdue(now));
        assert!(!order(ShippingStatus::Pending, Some(now + Duration::days(1))).is_overdue(now));
    }

    #[test]
    fn readiness_shortfall_saturates() {
        let short = PartReadiness {
            part_number: "P-1".into(),
            work_order_id: None,
            required: 10,
            available: 4,
        };
        assert!(!short.is_ready());
        assert_eq!(short.shortfall(), 6);

        let view = PartReadinessView::from(PartReadiness {
            available: 12,
            ..short
        });
        assert!(view.ready);
        assert_eq!(view.shortfall, 0);
    }
}
