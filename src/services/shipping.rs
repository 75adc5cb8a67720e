use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::datasource::DataSource;
use crate::errors::ServiceError;
use crate::models::{Delivery, PartReadinessView, ShippingOrder, ShippingStatus};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingFilter {
    pub status: Option<ShippingStatus>,
    /// Only outstanding orders past their ship-by date
    #[serde(default)]
    pub overdue: bool,
}

/// Shipping orders, deliveries and part readiness
#[derive(Clone)]
pub struct ShippingService {
    source: Arc<dyn DataSource>,
}

impl ShippingService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub async fn shipping_orders(
        &self,
        filter: &ShippingFilter,
    ) -> Result<Vec<ShippingOrder>, ServiceError> {
        let now = Utc::now();
        Ok(self
            .source
            .shipping_orders()
            .await?
            .into_iter()
            .filter(|so| filter.status.map_or(true, |s| so.status == s))
            .filter(|so| !filter.overdue || so.is_overdue(now))
            .collect())
    }

    pub async fn deliveries(
        &self,
        shipping_order_id: Option<&str>,
    ) -> Result<Vec<Delivery>, ServiceError> {
        Ok(self
            .source
            .deliveries()
            .await?
            .into_iter()
            .filter(|d| shipping_order_id.map_or(true, |id| d.shipping_order_id == id))
            .collect())
    }

    /// Readiness rows with the derived `ready` flag; shortages first
    pub async fn part_readiness(&self) -> Result<Vec<PartReadinessView>, ServiceError> {
        let mut rows: Vec<PartReadinessView> = self
            .source
            .part_readiness()
            .await?
            .into_iter()
            .map(PartReadinessView::from)
            .collect();
        rows.sort_by(|a, b| b.shortfall.cmp(&a.shortfall));
        Ok(rows)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: &str,
        status: ShippingStatus,
    ) -> Result<ShippingOrder, ServiceError> {
        let current = self
            .source
            .shipping_orders()
            .await?
            .into_iter()
            .find(|o| o.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("Shipping order {} not found", id)))?;
        let order = self
            .source
            .update_shipping_status(&current.id, status)
            .await?;
        info!(shipping_order_id = %id, status = %order.status, "shipping status set");
        Ok(order)
    }
}
