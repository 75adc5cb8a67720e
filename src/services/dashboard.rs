use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use strum::IntoEnumIterator;

use crate::datasource::DataSource;
use crate::errors::ServiceError;
use crate::models::MachineStatus;
use crate::services::alerts::AlertService;

/// Headline numbers for the dashboard landing page
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    /// Count per machine status; every status is present, zero or not
    pub machines_by_status: BTreeMap<String, usize>,
    pub machine_count: usize,
    pub open_work_orders: usize,
    pub overdue_work_orders: usize,
    pub outstanding_shipments: usize,
    pub overdue_shipments: usize,
    pub ecos_in_review: usize,
    pub components_below_reorder: usize,
    pub active_alerts: usize,
    pub generated_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct DashboardService {
    source: Arc<dyn DataSource>,
    alerts: Arc<AlertService>,
}

impl DashboardService {
    pub fn new(source: Arc<dyn DataSource>, alerts: Arc<AlertService>) -> Self {
        Self { source, alerts }
    }

    pub async fn summary(&self) -> Result<DashboardSummary, ServiceError> {
        let (machines, work_orders, shipping_orders, ecos, components) = tokio::try_join!(
            self.source.machines(),
            self.source.work_orders(),
            self.source.shipping_orders(),
            self.source.ecos(),
            self.source.components(),
        )?;
        let now = Utc::now();

        let mut machines_by_status: BTreeMap<String, usize> =
            MachineStatus::iter().map(|s| (s.to_string(), 0)).collect();
        for machine in &machines {
            *machines_by_status.entry(machine.status.to_string()).or_default() += 1;
        }

        Ok(DashboardSummary {
            machines_by_status,
            machine_count: machines.len(),
            open_work_orders: work_orders.iter().filter(|wo| wo.is_open()).count(),
            overdue_work_orders: work_orders.iter().filter(|wo| wo.is_overdue(now)).count(),
            outstanding_shipments: shipping_orders.iter().filter(|so| so.is_outstanding()).count(),
            overdue_shipments: shipping_orders.iter().filter(|so| so.is_overdue(now)).count(),
            ecos_in_review: ecos.iter().filter(|e| e.is_awaiting_review()).count(),
            components_below_reorder: components.iter().filter(|c| c.needs_reorder()).count(),
            active_alerts: self.alerts.active().await.len(),
            generated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerts::AlertThresholds;
    use crate::datasource::MockDataSource;
    use crate::notifications::NoopNotifier;

    #[tokio::test]
    async fn summary_counts_seeded_plant() {
        let source: Arc<dyn DataSource> = Arc::new(MockDataSource::seeded());
        let alerts = Arc::new(AlertService::new(
            source.clone(),
            AlertThresholds::default(),
            Arc::new(NoopNotifier),
        ));
        let dashboard = DashboardService::new(source, alerts.clone());

        let before = dashboard.summary().await.unwrap();
        assert_eq!(before.active_alerts, 0);
        assert_eq!(before.machine_count, 8);
        assert_eq!(before.machines_by_status["down"], 3);
        assert_eq!(before.machines_by_status["offline"], 0);
        assert_eq!(before.open_work_orders, 12);
        assert_eq!(before.outstanding_shipments, 5);
        assert_eq!(before.overdue_shipments, 4);
        assert_eq!(before.ecos_in_review, 5);
        assert_eq!(before.components_below_reorder, 2);

        alerts.refresh().await.unwrap();
        assert_eq!(dashboard.summary().await.unwrap().active_alerts, 5);
    }
}
