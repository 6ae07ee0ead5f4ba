use chrono::Utc;
use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::pagination::{Paginated, PaginationParams};
use uuid::Uuid;

use super::{require_user, require_user_by_id, today};
use crate::models::{Like, LikePredicate, LikeSummary, NewLike};
use crate::store::{SocialStore, StoreError};

fn already_liked() -> AppError {
    AppError::new(ErrorCode::LikeAlreadyExists, "you already like this user")
}

/// Adds the edge `source_user_id -> target_username`.
///
/// The self-like guard compares the acting user's stored username with the
/// username exactly as supplied, so a differently-cased spelling of one's own
/// name is not caught here.
pub async fn add_like(store: &dyn SocialStore, source_user_id: Uuid, target_username: &str) -> AppResult<Like> {
    let target = require_user(store, target_username).await?;
    let source = require_user_by_id(store, source_user_id).await?;

    if source.username == target_username {
        return Err(AppError::new(ErrorCode::CannotLikeSelf, "you cannot like yourself"));
    }

    let existing = store
        .find_like(source.id, target.id)
        .await
        .map_err(AppError::read_failed)?;
    if existing.is_some() {
        return Err(already_liked());
    }

    let like = store
        .insert_like(NewLike {
            source_user_id: source.id,
            liked_user_id: target.id,
            created_at: Utc::now(),
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation => already_liked(),
            other => AppError::write_failed(other),
        })?;

    tracing::info!(
        source = %source.username,
        target = %target.username,
        "like added"
    );

    Ok(like)
}

/// Paginated users on the other side of the requester's like edges.
pub async fn get_likes(
    store: &dyn SocialStore,
    user_id: Uuid,
    predicate: LikePredicate,
    params: &PaginationParams,
) -> AppResult<Paginated<LikeSummary>> {
    let page = store
        .liked_users(user_id, predicate, params)
        .await
        .map_err(AppError::read_failed)?;

    let ids: Vec<Uuid> = page.items.iter().map(|u| u.id).collect();
    let mut photos = store.main_photo_urls(&ids).await.map_err(AppError::read_failed)?;

    let today = today();
    let items = page
        .items
        .iter()
        .map(|u| LikeSummary::from_user(u, photos.remove(&u.id), today))
        .collect();

    Ok(Paginated::new(items, page.total, params))
}
