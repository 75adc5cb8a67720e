//! Where dashboard records come from: seeded mock fixtures or a live REST
//! backend, optionally falling back from the latter to the former.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use tracing::{info, instrument};

use crate::alerts::Snapshot;
use crate::config::{AppConfig, DataSourceKind};
use crate::errors::ServiceError;
use crate::models::{
    Component, Delivery, Document, Eco, Machine, MachineStatus, PartReadiness, ProductionEvent,
    ShippingOrder, ShippingStatus, UserProfile, WorkOrder,
};

pub mod fallback;
pub mod mock;
pub mod rest;

pub use fallback::FallbackDataSource;
pub use mock::MockDataSource;
pub use rest::RestDataSource;

/// Read and write access to the shop-floor records.
///
/// Writes take the full record as the caller wants it stored; status
/// transition rules are enforced by the services layer before a write.
#[async_trait]
pub trait DataSource: Send + Sync {
    /// Short label used in logs and `/status`
    fn name(&self) -> &'static str;

    async fn machines(&self) -> Result<Vec<Machine>, ServiceError>;
    async fn work_orders(&self) -> Result<Vec<WorkOrder>, ServiceError>;
    async fn ecos(&self) -> Result<Vec<Eco>, ServiceError>;
    async fn documents(&self) -> Result<Vec<Document>, ServiceError>;
    async fn components(&self) -> Result<Vec<Component>, ServiceError>;
    async fn shipping_orders(&self) -> Result<Vec<ShippingOrder>, ServiceError>;
    async fn deliveries(&self) -> Result<Vec<Delivery>, ServiceError>;
    async fn part_readiness(&self) -> Result<Vec<PartReadiness>, ServiceError>;
    async fn users(&self) -> Result<Vec<UserProfile>, ServiceError>;
    async fn production_events(&self) -> Result<Vec<ProductionEvent>, ServiceError>;

    async fn create_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError>;
    async fn update_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError>;
    async fn set_machine_status(
        &self,
        id: &str,
        status: MachineStatus,
    ) -> Result<Machine, ServiceError>;
    async fn create_eco(&self, eco: Eco) -> Result<Eco, ServiceError>;
    async fn update_eco(&self, eco: Eco) -> Result<Eco, ServiceError>;
    async fn update_shipping_status(
        &self,
        id: &str,
        status: ShippingStatus,
    ) -> Result<ShippingOrder, ServiceError>;
}

/// Reads everything the alert rules look at, concurrently.
#[instrument(skip(source), fields(source = source.name()))]
pub async fn fetch_snapshot(source: &dyn DataSource) -> Result<Snapshot, ServiceError> {
    let (machines, work_orders, shipping_orders, ecos, events) = tokio::try_join!(
        source.machines(),
        source.work_orders(),
        source.shipping_orders(),
        source.ecos(),
        source.production_events(),
    )?;

    Ok(Snapshot {
        machines,
        work_orders,
        shipping_orders,
        ecos,
        events,
        as_of: Utc::now(),
    })
}

/// Builds the data source selected by configuration.
pub fn from_config(config: &AppConfig) -> Result<Arc<dyn DataSource>, ServiceError> {
    match config.data_source {
        DataSourceKind::Mock => {
            info!("Using seeded mock data source");
            Ok(Arc::new(MockDataSource::seeded()))
        }
        DataSourceKind::Rest => {
            let base_url = config.rest_base_url.as_deref().ok_or_else(|| {
                ServiceError::BadRequest("rest_base_url is required for the rest data source".into())
            })?;
            let rest = RestDataSource::new(base_url, config.rest_timeout())?;
            info!(base_url = %base_url, fallback = config.fallback_to_mock, "Using REST data source");
            if config.fallback_to_mock {
                Ok(Arc::new(FallbackDataSource::new(
                    Arc::new(rest),
                    Arc::new(MockDataSource::seeded()),
                )))
            } else {
                Ok(Arc::new(rest))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn snapshot_collects_all_rule_inputs() {
        let source = MockDataSource::seeded();
        let snapshot = fetch_snapshot(&source).await.unwrap();
        assert!(!snapshot.machines.is_empty());
        assert!(!snapshot.work_orders.is_empty());
        assert!(!snapshot.shipping_orders.is_empty());
        assert!(!snapshot.ecos.is_empty());
        assert!(!snapshot.events.is_empty());
    }

    #[test]
    fn config_selects_mock_by_default() {
        let source = from_config(&AppConfig::default()).unwrap();
        assert_eq!(source.name(), "mock");
    }

    #[test]
    fn rest_with_fallback_wraps_source() {
        let config = AppConfig {
            data_source: DataSourceKind::Rest,
            rest_base_url: Some("http://localhost:4000/api".into()),
            ..AppConfig::default()
        };
        assert_eq!(from_config(&config).unwrap().name(), "rest+mock-fallback");

        let config = AppConfig {
            fallback_to_mock: false,
            ..config
        };
        assert_eq!(from_config(&config).unwrap().name(), "rest");
    }
}
