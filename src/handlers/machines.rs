use axum::{
    extract::{Path, State},
    Extension, Json,
};

use super::common::{JsonBody, QueryParams};
use crate::auth::CurrentUser;
use crate::models::{Machine, UpdateMachineStatusRequest};
use crate::services::machines::MachineFilter;
use crate::{ApiResponse, ApiResult, AppState};

pub async fn list_machines(
    State(state): State<AppState>,
    QueryParams(filter): QueryParams<MachineFilter>,
) -> ApiResult<Vec<Machine>> {
    let machines = state.services.machines.list(&filter).await?;
    Ok(Json(ApiResponse::success(machines)))
}

pub async fn get_machine(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Machine> {
    let machine = state.services.machines.get(&id).await?;
    Ok(Json(ApiResponse::success(machine)))
}

pub async fn update_machine_status(
    State(state): State<AppState>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    JsonBody(request): JsonBody<UpdateMachineStatusRequest>,
) -> ApiResult<Machine> {
    let machine = state
        .services
        .machines
        .set_status(&id, request, user.id())
        .await?;
    Ok(Json(ApiResponse::success(machine)))
}
