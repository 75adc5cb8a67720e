use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};

use super::common::{created, JsonBody, QueryParams};
use crate::errors::ServiceError;
use crate::models::{
    AssignWorkOrderRequest, CreateWorkOrderRequest, UpdateWorkOrderStatusRequest, WorkOrder,
};
use crate::services::work_orders::WorkOrderFilter;
use crate::{ApiResponse, ApiResult, AppState};

/// `GET /work-orders?status=&machineId=&priority=&assignedTo=`
pub async fn list_work_orders(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<WorkOrderFilter>,
) -> ApiResult<Vec<WorkOrder>> {
    let orders = state.services.work_orders.list(&filter).await?;
    Ok(Json(ApiResponse::success(orders)))
}

pub async fn get_work_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<WorkOrder> {
    let order = state.services.work_orders.get(&id).await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn create_work_order(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<CreateWorkOrderRequest>,
) -> Result<(StatusCode, Json<ApiResponse<WorkOrder>>), ServiceError> {
    let order = state.services.work_orders.create(request).await?;
    Ok(created(order))
}

pub async fn update_work_order_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateWorkOrderStatusRequest>,
) -> ApiResult<WorkOrder> {
    let order = state
        .services
        .work_orders
        .update_status(&id, request.status)
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

pub async fn assign_work_order(
    State(state): State<AppState>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<AssignWorkOrderRequest>,
) -> ApiResult<WorkOrder> {
    let order = state.services.work_orders.assign(&id, request).await?;
    Ok(Json(ApiResponse::success(order)))
}
