use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::datasource::DataSource;
use crate::errors::ServiceError;
use crate::models::{Machine, MachineStatus, UpdateMachineStatusRequest};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MachineFilter {
    pub status: Option<MachineStatus>,
    pub location: Option<String>,
}

/// Machine status board
#[derive(Clone)]
pub struct MachineService {
    source: Arc<dyn DataSource>,
}

impl MachineService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub async fn list(&self, filter: &MachineFilter) -> Result<Vec<Machine>, ServiceError> {
        Ok(self
            .source
            .machines()
            .await?
            .into_iter()
            .filter(|m| filter.status.map_or(true, |s| m.status == s))
            .filter(|m| {
                filter
                    .location
                    .as_ref()
                    .map_or(true, |l| m.location.eq_ignore_ascii_case(l))
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Machine, ServiceError> {
        self.source
            .machines()
            .await?
            .into_iter()
            .find(|m| m.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("Machine {} not found", id)))
    }

    /// Operator override of the board; any status may be set.
    #[instrument(skip(self, request), fields(status = %request.status))]
    pub async fn set_status(
        &self,
        id: &str,
        request: UpdateMachineStatusRequest,
        changed_by: &str,
    ) -> Result<Machine, ServiceError> {
        request.validate()?;
        // Writes only go to records the board already knows
        let current = self.get(id).await?;
        let machine = self
            .source
            .set_machine_status(&current.id, request.status)
            .await?;
        info!(
            machine_id = %id,
            status = %machine.status,
            changed_by,
            note = request.note.as_deref().unwrap_or(""),
            "machine status set"
        );
        Ok(machine)
    }
}
