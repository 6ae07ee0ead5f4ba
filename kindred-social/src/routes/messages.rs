use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::pagination::{PagedJson, PaginationParams};
use kindred_shared::types::{ApiResponse, Empty};

use crate::models::{MessageContainer, MessageSummary};
use crate::services::message_service;
use crate::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(min = 1, max = 64))]
    pub recipient_username: String,
    #[validate(length(min = 1, max = 4000))]
    pub content: String,
}

pub async fn create_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateMessageRequest>,
) -> AppResult<Json<ApiResponse<MessageSummary>>> {
    req.validate()?;

    let message = message_service::create_message(
        state.store.as_ref(),
        &user.username,
        &req.recipient_username,
        &req.content,
    )
    .await?;

    Ok(Json(ApiResponse::ok(message)))
}

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default)]
    pub container: MessageContainer,
}

pub async fn list_messages(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
    Query(page): Query<PaginationParams>,
) -> AppResult<PagedJson<MessageSummary>> {
    let messages =
        message_service::get_messages_for_user(state.store.as_ref(), &user.username, query.container, &page).await?;
    Ok(PagedJson(messages))
}

/// GET /messages/thread/:username
pub async fn get_thread(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(other): Path<String>,
) -> AppResult<Json<ApiResponse<Vec<MessageSummary>>>> {
    let thread = message_service::get_message_thread(state.store.as_ref(), &user.username, &other).await?;
    Ok(Json(ApiResponse::ok(thread)))
}

pub async fn delete_message(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    let id = Uuid::parse_str(&id).map_err(|_| AppError::new(ErrorCode::MessageNotFound, "message not found"))?;
    message_service::delete_message(state.store.as_ref(), &user.username, id).await?;
    Ok(Json(ApiResponse::done("message deleted")))
}
