use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::datasource::DataSource;
use crate::errors::ServiceError;
use crate::models::{
    AssignWorkOrderRequest, CreateWorkOrderRequest, WorkOrder, WorkOrderPriority, WorkOrderStatus,
};

/// Query filters for `GET /work-orders`; all optional and combined with AND
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkOrderFilter {
    pub status: Option<WorkOrderStatus>,
    pub machine_id: Option<String>,
    pub priority: Option<WorkOrderPriority>,
    pub assigned_to: Option<String>,
}

impl WorkOrderFilter {
    pub fn matches(&self, order: &WorkOrder) -> bool {
        self.status.map_or(true, |s| order.status == s)
            && self.priority.map_or(true, |p| order.priority == p)
            && self
                .machine_id
                .as_ref()
                .map_or(true, |m| order.machine_id.as_ref() == Some(m))
            && self
                .assigned_to
                .as_ref()
                .map_or(true, |a| order.assigned_to.as_ref() == Some(a))
    }
}

/// Service for managing work orders
#[derive(Clone)]
pub struct WorkOrderService {
    source: Arc<dyn DataSource>,
}

impl WorkOrderService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub async fn list(&self, filter: &WorkOrderFilter) -> Result<Vec<WorkOrder>, ServiceError> {
        Ok(self
            .source
            .work_orders()
            .await?
            .into_iter()
            .filter(|wo| filter.matches(wo))
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<WorkOrder, ServiceError> {
        self.source
            .work_orders()
            .await?
            .into_iter()
            .find(|wo| wo.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("Work order {} not found", id)))
    }

    /// Creates a new work order in `open` status
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create(&self, request: CreateWorkOrderRequest) -> Result<WorkOrder, ServiceError> {
        request.validate()?;

        if let Some(machine_id) = &request.machine_id {
            let known = self
                .source
                .machines()
                .await?
                .iter()
                .any(|m| &m.id == machine_id);
            if !known {
                return Err(ServiceError::ValidationError(format!(
                    "Unknown machine {}",
                    machine_id
                )));
            }
        }

        let order = WorkOrder {
            id: format!("WO-{}", &Uuid::new_v4().simple().to_string()[..8]),
            machine_id: request.machine_id,
            title: request.title,
            description: request.description,
            status: WorkOrderStatus::Open,
            priority: request.priority,
            assigned_to: request.assigned_to,
            created_at: Utc::now(),
            due_date: request.due_date,
            completed_at: None,
        };

        let created = self.source.create_work_order(order).await?;
        info!(work_order_id = %created.id, "work order created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn update_status(
        &self,
        id: &str,
        status: WorkOrderStatus,
    ) -> Result<WorkOrder, ServiceError> {
        let mut order = self.get(id).await?;
        let from = order.status;
        order.transition(status, Utc::now())?;
        let updated = self.source.update_work_order(order).await?;
        info!(work_order_id = %id, %from, to = %status, "work order status changed");
        Ok(updated)
    }

    #[instrument(skip(self, request))]
    pub async fn assign(
        &self,
        id: &str,
        request: AssignWorkOrderRequest,
    ) -> Result<WorkOrder, ServiceError> {
        request.validate()?;
        let mut order = self.get(id).await?;
        if order.status.is_terminal() {
            return Err(ServiceError::InvalidStatus(format!(
                "work order {} is {} and cannot be reassigned",
                id, order.status
            )));
        }
        order.assigned_to = Some(request.assigned_to);
        let updated = self.source.update_work_order(order).await?;
        info!(work_order_id = %id, assigned_to = ?updated.assigned_to, "work order assigned");
        Ok(updated)
    }
}
