use chrono::Utc;
use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::pagination::{Paginated, PaginationParams};
use uuid::Uuid;

use super::require_user;
use crate::models::{MessageContainer, MessageState, MessageSummary, NewMessage};
use crate::store::{SocialStore, StoreError};

fn message_not_found() -> AppError {
    AppError::new(ErrorCode::MessageNotFound, "message not found")
}

pub async fn create_message(
    store: &dyn SocialStore,
    sender_username: &str,
    recipient_username: &str,
    content: &str,
) -> AppResult<MessageSummary> {
    if sender_username.to_lowercase() == recipient_username.to_lowercase() {
        return Err(AppError::new(ErrorCode::CannotMessageSelf, "you cannot send messages to yourself"));
    }

    let sender = require_user(store, sender_username).await?;
    let recipient = require_user(store, recipient_username).await?;

    let message = store
        .insert_message(NewMessage {
            id: Uuid::now_v7(),
            sender_id: sender.id,
            sender_username: sender.username.clone(),
            recipient_id: recipient.id,
            recipient_username: recipient.username.clone(),
            content: content.to_string(),
            message_sent: Utc::now(),
        })
        .await
        .map_err(|e| match e {
            StoreError::NotFound => AppError::new(ErrorCode::UserNotFound, "user not found"),
            other => AppError::write_failed(other),
        })?;

    tracing::info!(
        message_id = %message.id,
        sender = %sender.username,
        recipient = %recipient.username,
        "message created"
    );

    Ok(MessageSummary::from(&message))
}

/// Hides the message from the acting user's side, purging it once both sides
/// have deleted. Deleting an already hidden side is a no-op.
pub async fn delete_message(store: &dyn SocialStore, acting_username: &str, message_id: Uuid) -> AppResult<MessageState> {
    let message = store
        .find_message(message_id)
        .await
        .map_err(AppError::read_failed)?
        .ok_or_else(message_not_found)?;

    let side = message.participant(acting_username).ok_or_else(|| {
        AppError::new(ErrorCode::NotMessageParticipant, "you cannot delete this message")
    })?;

    let state = store
        .delete_message_for(message_id, side)
        .await
        .map_err(|e| match e {
            StoreError::NotFound => message_not_found(),
            other => AppError::write_failed(other),
        })?;

    tracing::info!(message_id = %message_id, side = ?side, state = ?state, "message deleted");
    Ok(state)
}

pub async fn get_messages_for_user(
    store: &dyn SocialStore,
    username: &str,
    container: MessageContainer,
    params: &PaginationParams,
) -> AppResult<Paginated<MessageSummary>> {
    let page = store
        .messages_for_user(&username.to_lowercase(), container, params)
        .await
        .map_err(AppError::read_failed)?;

    let items = page.items.iter().map(MessageSummary::from).collect();
    Ok(Paginated::new(items, page.total, params))
}

/// Conversation with `other_username`, oldest first. Marks received messages read.
pub async fn get_message_thread(
    store: &dyn SocialStore,
    username: &str,
    other_username: &str,
) -> AppResult<Vec<MessageSummary>> {
    let other = require_user(store, other_username).await?;

    let thread = store
        .message_thread(&username.to_lowercase(), &other.username, Utc::now())
        .await
        .map_err(AppError::write_failed)?;

    Ok(thread.iter().map(MessageSummary::from).collect())
}
