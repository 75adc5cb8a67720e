use chrono::Utc;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

use crate::datasource::DataSource;
use crate::errors::ServiceError;
use crate::models::{CreateEcoRequest, Eco, EcoStatus};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EcoFilter {
    pub status: Option<EcoStatus>,
    pub machine_id: Option<String>,
}

impl EcoFilter {
    pub fn matches(&self, eco: &Eco) -> bool {
        self.status.map_or(true, |s| eco.status == s)
            && self
                .machine_id
                .as_ref()
                .map_or(true, |m| eco.affected_machines.contains(m))
    }
}

/// Engineering change orders and their review cycle
#[derive(Clone)]
pub struct EcoService {
    source: Arc<dyn DataSource>,
}

impl EcoService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub async fn list(&self, filter: &EcoFilter) -> Result<Vec<Eco>, ServiceError> {
        Ok(self
            .source
            .ecos()
            .await?
            .into_iter()
            .filter(|eco| filter.matches(eco))
            .collect())
    }

    pub async fn get(&self, id: &str) -> Result<Eco, ServiceError> {
        self.source
            .ecos()
            .await?
            .into_iter()
            .find(|eco| eco.id == id)
            .ok_or_else(|| ServiceError::NotFound(format!("ECO {} not found", id)))
    }

    /// Opens a draft ECO on behalf of `requested_by`
    #[instrument(skip(self, request), fields(title = %request.title))]
    pub async fn create(
        &self,
        request: CreateEcoRequest,
        requested_by: &str,
    ) -> Result<Eco, ServiceError> {
        request.validate()?;

        let eco = Eco {
            id: format!("ECO-{}", &Uuid::new_v4().simple().to_string()[..8]),
            title: request.title,
            description: request.description,
            status: EcoStatus::Draft,
            requested_by: requested_by.to_string(),
            affected_machines: request.affected_machines,
            affected_documents: request.affected_documents,
            created_at: Utc::now(),
            submitted_at: None,
            decided_at: None,
        };
        let created = self.source.create_eco(eco).await?;
        info!(eco_id = %created.id, requested_by, "ECO created");
        Ok(created)
    }

    /// Moves an ECO along its review cycle
    #[instrument(skip(self))]
    pub async fn transition(&self, id: &str, next: EcoStatus) -> Result<Eco, ServiceError> {
        let mut eco = self.get(id).await?;
        let from = eco.status;
        eco.transition(next, Utc::now())?;
        let updated = self.source.update_eco(eco).await?;
        info!(eco_id = %id, %from, to = %next, "ECO status changed");
        Ok(updated)
    }

    pub async fn submit(&self, id: &str) -> Result<Eco, ServiceError> {
        self.transition(id, EcoStatus::InReview).await
    }

    pub async fn approve(&self, id: &str) -> Result<Eco, ServiceError> {
        self.transition(id, EcoStatus::Approved).await
    }

    pub async fn reject(&self, id: &str) -> Result<Eco, ServiceError> {
        self.transition(id, EcoStatus::Rejected).await
    }

    pub async fn implement(&self, id: &str) -> Result<Eco, ServiceError> {
        self.transition(id, EcoStatus::Implemented).await
    }

    /// Sends a rejected ECO back to draft for rework
    pub async fn reopen(&self, id: &str) -> Result<Eco, ServiceError> {
        self.transition(id, EcoStatus::Draft).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;
    use assert_matches::assert_matches;

    fn service() -> EcoService {
        EcoService::new(Arc::new(MockDataSource::seeded()))
    }

    #[tokio::test]
    async fn full_review_cycle() {
        let svc = service();
        let eco = svc
            .create(
                CreateEcoRequest {
                    title: "Add chip guard".into(),
                    description: None,
                    affected_machines: vec!["M-101".into()],
                    affected_documents: vec![],
                },
                "U-3",
            )
            .await
            .unwrap();
        assert_eq!(eco.status, EcoStatus::Draft);
        assert_eq!(eco.requested_by, "U-3");

        assert_eq!(svc.submit(&eco.id).await.unwrap().status, EcoStatus::InReview);
        assert_eq!(svc.reject(&eco.id).await.unwrap().status, EcoStatus::Rejected);
        assert_eq!(svc.reopen(&eco.id).await.unwrap().status, EcoStatus::Draft);
        svc.submit(&eco.id).await.unwrap();
        let approved = svc.approve(&eco.id).await.unwrap();
        assert!(approved.decided_at.is_some());
        assert_eq!(
            svc.implement(&eco.id).await.unwrap().status,
            EcoStatus::Implemented
        );
    }

    #[tokio::test]
    async fn draft_cannot_be_approved() {
        assert_matches!(
            service().approve("ECO-306").await,
            Err(ServiceError::InvalidStatus(_))
        );
    }

    #[tokio::test]
    async fn filter_by_status_and_machine() {
        let svc = service();
        let filter = EcoFilter {
            status: Some(EcoStatus::InReview),
            machine_id: Some("M-105".into()),
        };
        let ecos = svc.list(&filter).await.unwrap();
        assert_eq!(ecos.len(), 1);
        assert_eq!(ecos[0].id, "ECO-302");
    }
}
