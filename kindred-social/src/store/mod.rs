//! Persistence boundary for users, photos, likes and messages.
//!
//! Every mutating method is one atomic unit: it either commits entirely or leaves
//! no trace. Uniqueness (one like per ordered pair, one main photo per user,
//! one username) is enforced by the store itself, not only by callers' pre-checks.

use std::collections::HashMap;

use chrono::{DateTime, NaiveDate, Utc};
use kindred_shared::types::pagination::PaginationParams;
use uuid::Uuid;

use crate::models::{
    Like, LikePredicate, MemberOrder, Message, MessageContainer, MessageState, NewLike,
    NewMessage, NewPhoto, NewUser, Participant, Photo, UpdateUser, User,
};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unique constraint violated")]
    UniqueViolation,
    #[error("record not found")]
    NotFound,
    #[error("storage backend error: {0}")]
    Backend(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// One page of rows plus the unpaginated total.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
}

/// Discovery filter, already resolved from request defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct MemberFilter {
    pub exclude_username: String,
    pub gender: Option<String>,
    /// Exclusive lower bound on date of birth (oldest allowed age + 1).
    pub born_after: NaiveDate,
    /// Inclusive upper bound on date of birth (youngest allowed age).
    pub born_on_or_before: NaiveDate,
    pub order_by: MemberOrder,
}

impl MemberFilter {
    pub fn matches(&self, user: &User) -> bool {
        user.username != self.exclude_username
            && self.gender.as_deref().map_or(true, |g| user.gender == g)
            && user.date_of_birth > self.born_after
            && user.date_of_birth <= self.born_on_or_before
    }
}

#[async_trait::async_trait]
pub trait SocialStore: Send + Sync {
    async fn ping(&self) -> StoreResult<()>;

    // --- users ---

    /// Fails with `UniqueViolation` when the username is taken.
    async fn insert_user(&self, user: NewUser) -> StoreResult<User>;
    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>>;
    /// `username` must already be lower-cased.
    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
    /// Fails with `NotFound` when the user does not exist.
    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User>;
    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()>;
    async fn query_members(&self, filter: &MemberFilter, page: &PaginationParams) -> StoreResult<Page<User>>;

    // --- photos ---

    async fn photos_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Photo>>;
    /// Main photo url per user, for users that have one.
    async fn main_photo_urls(&self, user_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>>;
    /// The new photo becomes main iff the user had no photos when it was inserted.
    async fn insert_photo(&self, photo: NewPhoto) -> StoreResult<Photo>;
    /// Moves the main flag to `photo_id`. `NotFound` if the photo is not the user's.
    async fn set_main_photo(&self, user_id: Uuid, photo_id: Uuid) -> StoreResult<()>;
    /// `NotFound` if the photo is not the user's.
    async fn delete_photo(&self, user_id: Uuid, photo_id: Uuid) -> StoreResult<()>;

    // --- likes ---

    async fn find_like(&self, source_user_id: Uuid, liked_user_id: Uuid) -> StoreResult<Option<Like>>;
    /// Fails with `UniqueViolation` when the edge already exists.
    async fn insert_like(&self, like: NewLike) -> StoreResult<Like>;
    /// Users on the other end of `user_id`'s edges, ordered by username.
    async fn liked_users(
        &self,
        user_id: Uuid,
        predicate: LikePredicate,
        page: &PaginationParams,
    ) -> StoreResult<Page<User>>;

    // --- messages ---

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message>;
    async fn find_message(&self, id: Uuid) -> StoreResult<Option<Message>>;
    /// Applies `MessageState::delete_by(side)` and, when the result is `Purged`,
    /// removes the row in the same commit. `NotFound` if the message is gone.
    async fn delete_message_for(&self, id: Uuid, side: Participant) -> StoreResult<MessageState>;
    /// Newest first.
    async fn messages_for_user(
        &self,
        username: &str,
        container: MessageContainer,
        page: &PaginationParams,
    ) -> StoreResult<Page<Message>>;
    /// Messages between the two users still visible to `username`, oldest first.
    /// Unread messages addressed to `username` are marked read at `read_at` first.
    async fn message_thread(
        &self,
        username: &str,
        other_username: &str,
        read_at: DateTime<Utc>,
    ) -> StoreResult<Vec<Message>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::birth_date_bounds;

    fn user(username: &str, gender: &str, dob: NaiveDate) -> User {
        let now = Utc::now();
        User {
            id: Uuid::now_v7(),
            username: username.into(),
            known_as: None,
            gender: gender.into(),
            date_of_birth: dob,
            city: None,
            country: None,
            introduction: None,
            looking_for: None,
            interests: None,
            created_at: now,
            last_active: now,
        }
    }

    #[test]
    fn member_filter_applies_every_clause() {
        let today = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let (born_after, born_on_or_before) = birth_date_bounds(18, 40, today);
        let filter = MemberFilter {
            exclude_username: "alice".into(),
            gender: Some("male".into()),
            born_after,
            born_on_or_before,
            order_by: MemberOrder::LastActive,
        };
        let adult = NaiveDate::from_ymd_opt(1995, 5, 5).unwrap();
        let minor = NaiveDate::from_ymd_opt(2010, 5, 5).unwrap();

        assert!(filter.matches(&user("bob", "male", adult)));
        assert!(!filter.matches(&user("alice", "male", adult)));
        assert!(!filter.matches(&user("carol", "female", adult)));
        assert!(!filter.matches(&user("dave", "male", minor)));
    }
}
