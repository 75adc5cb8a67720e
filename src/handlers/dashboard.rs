use axum::{extract::State, Json};

use crate::services::dashboard::DashboardSummary;
use crate::{ApiResponse, ApiResult, AppState};

pub async fn dashboard_summary(State(state): State<AppState>) -> ApiResult<DashboardSummary> {
    let summary = state.services.dashboard.summary().await?;
    Ok(Json(ApiResponse::success(summary)))
}
