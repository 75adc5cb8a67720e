use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use tracing::warn;

use super::{DataSource, MockDataSource};
use crate::errors::ServiceError;
use crate::models::{
    Component, Delivery, Document, Eco, Machine, MachineStatus, PartReadiness, ProductionEvent,
    ShippingOrder, ShippingStatus, UserProfile, WorkOrder,
};

/// Reads from the live source and serves mock data when a read fails.
///
/// Writes go to the live source only; their errors reach the caller.
pub struct FallbackDataSource {
    primary: Arc<dyn DataSource>,
    fallback: Arc<MockDataSource>,
}

impl FallbackDataSource {
    pub fn new(primary: Arc<dyn DataSource>, fallback: Arc<MockDataSource>) -> Self {
        Self { primary, fallback }
    }

    async fn or_mock<T, F>(
        &self,
        collection: &'static str,
        live: Result<Vec<T>, ServiceError>,
        mock: F,
    ) -> Result<Vec<T>, ServiceError>
    where
        F: Future<Output = Result<Vec<T>, ServiceError>>,
    {
        match live {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(
                    source = self.primary.name(),
                    collection,
                    error = %err,
                    "live read failed, serving mock data"
                );
                mock.await
            }
        }
    }
}

#[async_trait]
impl DataSource for FallbackDataSource {
    fn name(&self) -> &'static str {
        "rest+mock-fallback"
    }

    async fn machines(&self) -> Result<Vec<Machine>, ServiceError> {
        let live = self.primary.machines().await;
        self.or_mock("machines", live, self.fallback.machines()).await
    }

    async fn work_orders(&self) -> Result<Vec<WorkOrder>, ServiceError> {
        let live = self.primary.work_orders().await;
        self.or_mock("work_orders", live, self.fallback.work_orders()).await
    }

    async fn ecos(&self) -> Result<Vec<Eco>, ServiceError> {
        let live = self.primary.ecos().await;
        self.or_mock("ecos", live, self.fallback.ecos()).await
    }

    async fn documents(&self) -> Result<Vec<Document>, ServiceError> {
        let live = self.primary.documents().await;
        self.or_mock("documents", live, self.fallback.documents()).await
    }

    async fn components(&self) -> Result<Vec<Component>, ServiceError> {
        let live = self.primary.components().await;
        self.or_mock("components", live, self.fallback.components()).await
    }

    async fn shipping_orders(&self) -> Result<Vec<ShippingOrder>, ServiceError> {
        let live = self.primary.shipping_orders().await;
        self.or_mock("shipping_orders", live, self.fallback.shipping_orders()).await
    }

    async fn deliveries(&self) -> Result<Vec<Delivery>, ServiceError> {
        let live = self.primary.deliveries().await;
        self.or_mock("deliveries", live, self.fallback.deliveries()).await
    }

    async fn part_readiness(&self) -> Result<Vec<PartReadiness>, ServiceError> {
        let live = self.primary.part_readiness().await;
        self.or_mock("part_readiness", live, self.fallback.part_readiness()).await
    }

    async fn users(&self) -> Result<Vec<UserProfile>, ServiceError> {
        let live = self.primary.users().await;
        self.or_mock("users", live, self.fallback.users()).await
    }

    async fn production_events(&self) -> Result<Vec<ProductionEvent>, ServiceError> {
        let live = self.primary.production_events().await;
        self.or_mock("production_events", live, self.fallback.production_events()).await
    }

    async fn create_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError> {
        self.primary.create_work_order(order).await
    }

    async fn update_work_order(&self, order: WorkOrder) -> Result<WorkOrder, ServiceError> {
        self.primary.update_work_order(order).await
    }

    async fn set_machine_status(
        &self,
        id: &str,
        status: MachineStatus,
    ) -> Result<Machine, ServiceError> {
        self.primary.set_machine_status(id, status).await
    }

    async fn create_eco(&self, eco: Eco) -> Result<Eco, ServiceError> {
        self.primary.create_eco(eco).await
    }

    async fn update_eco(&self, eco: Eco) -> Result<Eco, ServiceError> {
        self.primary.update_eco(eco).await
    }

    async fn update_shipping_status(
        &self,
        id: &str,
        status: ShippingStatus,
    ) -> Result<ShippingOrder, ServiceError> {
        self.primary.update_shipping_status(id, status).await
    }
}
