use chrono::{NaiveDate, Utc};
use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::pagination::{Paginated, PaginationParams};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use super::{require_user, today};
use crate::models::{
    birth_date_bounds, Gender, MemberDetail, MemberOrder, MemberSummary, NewUser, UpdateUser, User,
};
use crate::store::{MemberFilter, SocialStore, StoreError};

pub const DEFAULT_MIN_AGE: u32 = 18;
pub const DEFAULT_MAX_AGE: u32 = 150;

/// Discovery filters as they arrive on the query string.
#[derive(Debug, Clone, Deserialize)]
pub struct MemberQuery {
    pub gender: Option<String>,
    #[serde(default = "default_min_age")]
    pub min_age: u32,
    #[serde(default = "default_max_age")]
    pub max_age: u32,
    #[serde(default)]
    pub order_by: MemberOrder,
}

fn default_min_age() -> u32 { DEFAULT_MIN_AGE }
fn default_max_age() -> u32 { DEFAULT_MAX_AGE }

impl Default for MemberQuery {
    fn default() -> Self {
        Self {
            gender: None,
            min_age: DEFAULT_MIN_AGE,
            max_age: DEFAULT_MAX_AGE,
            order_by: MemberOrder::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterUserRequest {
    #[validate(length(min = 3, max = 32))]
    pub username: String,
    #[validate(length(min = 1, max = 32))]
    pub gender: String,
    pub date_of_birth: NaiveDate,
    #[validate(length(min = 1, max = 64))]
    pub known_as: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

/// Resolves the effective filter for `requester`: an unset gender defaults to the
/// opposite of the requester's, and no gender filter applies when theirs is
/// outside the binary domain.
fn resolve_filter(requester: &User, query: &MemberQuery, today: NaiveDate) -> MemberFilter {
    let gender = match &query.gender {
        Some(gender) => Some(gender.trim().to_lowercase()),
        None => Gender::parse(&requester.gender).map(|g| g.opposite().as_str().to_string()),
    };
    let (born_after, born_on_or_before) = birth_date_bounds(query.min_age, query.max_age, today);

    MemberFilter {
        exclude_username: requester.username.clone(),
        gender,
        born_after,
        born_on_or_before,
        order_by: query.order_by,
    }
}

pub async fn get_members(
    store: &dyn SocialStore,
    requesting_username: &str,
    query: &MemberQuery,
    params: &PaginationParams,
) -> AppResult<Paginated<MemberSummary>> {
    let requester = require_user(store, requesting_username).await?;
    let today = today();
    let filter = resolve_filter(&requester, query, today);

    let page = store
        .query_members(&filter, params)
        .await
        .map_err(AppError::read_failed)?;

    let ids: Vec<Uuid> = page.items.iter().map(|u| u.id).collect();
    let mut photos = store.main_photo_urls(&ids).await.map_err(AppError::read_failed)?;

    let items = page
        .items
        .iter()
        .map(|u| MemberSummary::from_user(u, photos.remove(&u.id), today))
        .collect();

    Ok(Paginated::new(items, page.total, params))
}

async fn detail_for(store: &dyn SocialStore, user: User) -> AppResult<MemberDetail> {
    let photos = store.photos_for_user(user.id).await.map_err(AppError::read_failed)?;
    let main_url = photos.iter().find(|p| p.is_main).map(|p| p.url.clone());

    Ok(MemberDetail {
        summary: MemberSummary::from_user(&user, main_url, today()),
        introduction: user.introduction,
        looking_for: user.looking_for,
        interests: user.interests,
        photos,
    })
}

pub async fn get_member(store: &dyn SocialStore, username: &str) -> AppResult<MemberDetail> {
    let user = require_user(store, username).await?;
    detail_for(store, user).await
}

pub async fn update_member(store: &dyn SocialStore, user_id: Uuid, changes: UpdateUser) -> AppResult<MemberDetail> {
    let user = store.update_user(user_id, changes).await.map_err(|e| match e {
        StoreError::NotFound => AppError::new(ErrorCode::UserNotFound, "user not found"),
        other => AppError::write_failed(other),
    })?;

    tracing::info!(user_id = %user.id, "profile updated");
    detail_for(store, user).await
}

pub async fn register_user(store: &dyn SocialStore, req: RegisterUserRequest) -> AppResult<User> {
    let username = req.username.trim().to_lowercase();
    let taken = || AppError::new(ErrorCode::UsernameTaken, "username is already taken");

    let existing = store
        .find_user_by_username(&username)
        .await
        .map_err(AppError::read_failed)?;
    if existing.is_some() {
        return Err(taken());
    }

    let now = Utc::now();
    let user = store
        .insert_user(NewUser {
            id: Uuid::now_v7(),
            username,
            known_as: req.known_as,
            gender: req.gender.trim().to_lowercase(),
            date_of_birth: req.date_of_birth,
            city: req.city,
            country: req.country,
            created_at: now,
            last_active: now,
        })
        .await
        .map_err(|e| match e {
            StoreError::UniqueViolation => taken(),
            other => AppError::write_failed(other),
        })?;

    tracing::info!(user_id = %user.id, username = %user.username, "user registered");
    Ok(user)
}

/// Refreshes the caller's last-active timestamp. Never fails the request.
pub async fn record_activity(store: &dyn SocialStore, user_id: Uuid) {
    if let Err(e) = store.touch_last_active(user_id, Utc::now()).await {
        tracing::warn!(user_id = %user_id, error = %e, "failed to record activity");
    }
}
