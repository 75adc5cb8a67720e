use serde::Deserialize;
use std::sync::Arc;

use crate::datasource::DataSource;
use crate::errors::ServiceError;
use crate::models::{Component, Document, DocumentKind};

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentFilter {
    pub kind: Option<DocumentKind>,
}

#[derive(Debug, Default, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentFilter {
    /// Only components at or below their reorder point
    #[serde(default)]
    pub needs_reorder: bool,
}

/// Document library and component stock
#[derive(Clone)]
pub struct CatalogService {
    source: Arc<dyn DataSource>,
}

impl CatalogService {
    pub fn new(source: Arc<dyn DataSource>) -> Self {
        Self { source }
    }

    pub async fn documents(&self, filter: &DocumentFilter) -> Result<Vec<Document>, ServiceError> {
        Ok(self
            .source
            .documents()
            .await?
            .into_iter()
            .filter(|d| filter.kind.map_or(true, |k| d.kind == k))
            .collect())
    }

    pub async fn components(
        &self,
        filter: &ComponentFilter,
    ) -> Result<Vec<Component>, ServiceError> {
        Ok(self
            .source
            .components()
            .await?
            .into_iter()
            .filter(|c| !filter.needs_reorder || c.needs_reorder())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::MockDataSource;

    #[tokio::test]
    async fn reorder_filter_uses_reorder_point() {
        let svc = CatalogService::new(Arc::new(MockDataSource::seeded()));
        let low = svc
            .components(&ComponentFilter {
                needs_reorder: true,
            })
            .await
            .unwrap();
        let parts: Vec<_> = low.iter().map(|c| c.part_number.as_str()).collect();
        assert_eq!(parts, vec!["BRG-6205", "LNR-062"]);
    }

    #[tokio::test]
    async fn documents_filter_by_kind() {
        let svc = CatalogService::new(Arc::new(MockDataSource::seeded()));
        let docs = svc
            .documents(&DocumentFilter {
                kind: Some(DocumentKind::Procedure),
            })
            .await
            .unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "DOC-11");
    }
}
