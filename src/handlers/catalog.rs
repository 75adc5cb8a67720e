use axum::{extract::State, Json};

use super::common::QueryParams;
use crate::models::{Component, Document};
use crate::services::catalog::{ComponentFilter, DocumentFilter};
use crate::{ApiResponse, ApiResult, AppState};

pub async fn list_documents(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<DocumentFilter>,
) -> ApiResult<Vec<Document>> {
    let documents = state.services.catalog.documents(&filter).await?;
    Ok(Json(ApiResponse::success(documents)))
}

/// `GET /components?needsReorder=true`
pub async fn list_components(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<ComponentFilter>,
) -> ApiResult<Vec<Component>> {
    let components = state.services.catalog.components(&filter).await?;
    Ok(Json(ApiResponse::success(components)))
}
