use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};

use super::common::{created, JsonBody, QueryParams};
use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::models::{CreateEcoRequest, Eco};
use crate::services::ecos::EcoFilter;
use crate::{ApiResponse, ApiResult, AppState};

pub async fn list_ecos(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<EcoFilter>,
) -> ApiResult<Vec<Eco>> {
    let ecos = state.services.ecos.list(&filter).await?;
    Ok(Json(ApiResponse::success(ecos)))
}

pub async fn get_eco(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Eco> {
    let eco = state.services.ecos.get(&id).await?;
    Ok(Json(ApiResponse::success(eco)))
}

/// Creates a draft requested by the current user
pub async fn create_eco(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    JsonBody(request): JsonBody<CreateEcoRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Eco>>), ServiceError> {
    let eco = state.services.ecos.create(request, user.id()).await?;
    Ok(created(eco))
}

pub async fn submit_eco(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Eco> {
    let eco = state.services.ecos.submit(&id).await?;
    Ok(Json(ApiResponse::success(eco)))
}

pub async fn reopen_eco(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Eco> {
    let eco = state.services.ecos.reopen(&id).await?;
    Ok(Json(ApiResponse::success(eco)))
}

pub async fn approve_eco(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Eco> {
    let eco = state.services.ecos.approve(&id).await?;
    Ok(Json(ApiResponse::success(eco)))
}

pub async fn reject_eco(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Eco> {
    let eco = state.services.ecos.reject(&id).await?;
    Ok(Json(ApiResponse::success(eco)))
}

pub async fn implement_eco(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Eco> {
    let eco = state.services.ecos.implement(&id).await?;
    Ok(Json(ApiResponse::success(eco)))
}
