use axum::{extract::State, Json};

use crate::models::UserProfile;
use crate::{ApiResponse, ApiResult, AppState};

pub async fn list_users(State(state): State<AppState>) -> ApiResult<Vec<UserProfile>> {
    let users = state.data_source.users().await?;
    Ok(Json(ApiResponse::success(users)))
}
