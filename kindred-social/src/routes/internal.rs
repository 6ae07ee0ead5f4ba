use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use validator::Validate;

use kindred_shared::errors::AppResult;
use kindred_shared::types::ApiResponse;

use crate::models::User;
use crate::services::member_service::{self, RegisterUserRequest};
use crate::AppState;

/// POST /internal/users - provisions the social record for a newly issued identity
pub async fn register_user(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterUserRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    req.validate()?;

    let user = member_service::register_user(state.store.as_ref(), req).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::ok(user))))
}
