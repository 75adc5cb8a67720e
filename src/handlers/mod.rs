pub mod alerts;
pub mod catalog;
pub mod common;
pub mod dashboard;
pub mod ecos;
pub mod machines;
pub mod session;
pub mod shipping;
pub mod users;
pub mod work_orders;

use std::sync::Arc;

use crate::alerts::AlertThresholds;
use crate::datasource::DataSource;
use crate::notifications::Notifier;
use crate::services::{
    alerts::AlertService, catalog::CatalogService, dashboard::DashboardService, ecos::EcoService,
    machines::MachineService, shipping::ShippingService, work_orders::WorkOrderService,
};

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates the operations used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub machines: Arc<MachineService>,
    pub work_orders: Arc<WorkOrderService>,
    pub ecos: Arc<EcoService>,
    pub shipping: Arc<ShippingService>,
    pub catalog: Arc<CatalogService>,
    pub alerts: Arc<AlertService>,
    pub dashboard: Arc<DashboardService>,
}

impl AppServices {
    /// Build every service over the same data source.
    pub fn new(
        source: Arc<dyn DataSource>,
        thresholds: AlertThresholds,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let alerts = Arc::new(AlertService::new(source.clone(), thresholds, notifier));
        let dashboard = Arc::new(DashboardService::new(source.clone(), alerts.clone()));

        Self {
            machines: Arc::new(MachineService::new(source.clone())),
            work_orders: Arc::new(WorkOrderService::new(source.clone())),
            ecos: Arc::new(EcoService::new(source.clone())),
            shipping: Arc::new(ShippingService::new(source.clone())),
            catalog: Arc::new(CatalogService::new(source)),
            alerts,
            dashboard,
        }
    }
}
