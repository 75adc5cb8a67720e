use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use super::common::JsonBody;
use crate::auth::CurrentUser;
use crate::errors::ServiceError;
use crate::{ApiResponse, ApiResult, AppState};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SwitchUserRequest {
    pub user_id: String,
}

/// Current user and their capabilities
pub async fn get_session(Extension(user): Extension<CurrentUser>) -> ApiResult<CurrentUser> {
    Ok(Json(ApiResponse::success(user)))
}

/// Switches the current user; no credentials are involved
pub async fn switch_session(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<SwitchUserRequest>,
) -> ApiResult<CurrentUser> {
    let user_id = request.user_id.trim();
    if user_id.is_empty() {
        return Err(ServiceError::ValidationError(
            "userId must not be empty".into(),
        ));
    }
    let user = state.auth.switch_user(user_id).await?;
    Ok(Json(ApiResponse::success(user)))
}
