use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use super::common::QueryParams;
use crate::alerts::Alert;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertListQuery {
    #[serde(default)]
    pub include_dismissed: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertRefreshResponse {
    pub raised: Vec<Alert>,
    pub escalated: Vec<Alert>,
    pub resolved: Vec<String>,
    pub active: Vec<Alert>,
}

/// `GET /alerts`; dismissed alerts only with `?includeDismissed=true`
pub async fn list_alerts(
    State(state): State<AppState>,
    QueryParams(query): QueryParams<AlertListQuery>,
) -> ApiResult<Vec<Alert>> {
    let alerts = if query.include_dismissed {
        state.services.alerts.all().await
    } else {
        state.services.alerts.active().await
    };
    Ok(Json(ApiResponse::success(alerts)))
}

pub async fn refresh_alerts(State(state): State<AppState>) -> ApiResult<AlertRefreshResponse> {
    let outcome = state.services.alerts.refresh().await?;
    let active = state.services.alerts.active().await;
    Ok(Json(ApiResponse::success(AlertRefreshResponse {
        raised: outcome.raised,
        escalated: outcome.escalated,
        resolved: outcome.resolved,
        active,
    })))
}

pub async fn dismiss_alert(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Alert> {
    let alert = state.services.alerts.dismiss(&id).await?;
    Ok(Json(ApiResponse::success(alert)))
}
