use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use kindred_shared::types::pagination::PaginationParams;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{MemberFilter, Page, SocialStore, StoreError, StoreResult};
use crate::models::{
    Like, LikePredicate, MemberOrder, Message, MessageContainer, MessageState, NewLike,
    NewMessage, NewPhoto, NewUser, Participant, Photo, UpdateUser, User,
};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    photos: HashMap<Uuid, Photo>,
    likes: HashMap<(Uuid, Uuid), Like>,
    messages: HashMap<Uuid, Message>,
}

/// In-process store. Each operation runs inside one critical section, which gives
/// the same all-or-nothing behaviour as a Postgres transaction.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    unreachable: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every subsequent mutation fail with a backend error.
    #[cfg(test)]
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Makes `ping` report the store as down.
    #[cfg(test)]
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    #[cfg(test)]
    pub async fn like_count(&self) -> usize {
        self.state.lock().await.likes.len()
    }

    #[cfg(test)]
    pub async fn message_count(&self) -> usize {
        self.state.lock().await.messages.len()
    }

    fn check_writable(&self) -> StoreResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("memory store is read-only")));
        }
        Ok(())
    }
}

fn paginate<T>(items: Vec<T>, page: &PaginationParams) -> Page<T> {
    let total = items.len() as u64;
    let items = items
        .into_iter()
        .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
        .take(page.limit() as usize)
        .collect();
    Page { items, total }
}

fn owns_photo(state: &State, user_id: Uuid, photo_id: Uuid) -> bool {
    state.photos.get(&photo_id).is_some_and(|p| p.user_id == user_id)
}

#[async_trait::async_trait]
impl SocialStore for MemoryStore {
    async fn ping(&self) -> StoreResult<()> {
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StoreError::Backend(anyhow::anyhow!("connection refused: memory store at 10.0.0.5")));
        }
        Ok(())
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if state.users.values().any(|u| u.username == user.username) {
            return Err(StoreError::UniqueViolation);
        }

        let user = User {
            id: user.id,
            username: user.username,
            known_as: user.known_as,
            gender: user.gender,
            date_of_birth: user.date_of_birth,
            city: user.city,
            country: user.country,
            introduction: None,
            looking_for: None,
            interests: None,
            created_at: user.created_at,
            last_active: user.last_active,
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(self.state.lock().await.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let state = self.state.lock().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let user = state.users.get_mut(&id).ok_or(StoreError::NotFound)?;
        changes.apply_to(user);
        Ok(user.clone())
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if let Some(user) = state.users.get_mut(&id) {
            user.last_active = at;
        }
        Ok(())
    }

    async fn query_members(&self, filter: &MemberFilter, page: &PaginationParams) -> StoreResult<Page<User>> {
        let state = self.state.lock().await;
        let mut members: Vec<User> = state
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect();

        match filter.order_by {
            MemberOrder::LastActive => members.sort_by(|a, b| {
                b.last_active.cmp(&a.last_active).then_with(|| a.username.cmp(&b.username))
            }),
            MemberOrder::Created => members.sort_by(|a, b| {
                b.created_at.cmp(&a.created_at).then_with(|| a.username.cmp(&b.username))
            }),
        }

        Ok(paginate(members, page))
    }

    async fn photos_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Photo>> {
        let state = self.state.lock().await;
        let mut photos: Vec<Photo> = state
            .photos
            .values()
            .filter(|p| p.user_id == user_id)
            .cloned()
            .collect();
        photos.sort_by_key(|p| p.created_at);
        Ok(photos)
    }

    async fn main_photo_urls(&self, user_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>> {
        let state = self.state.lock().await;
        Ok(state
            .photos
            .values()
            .filter(|p| p.is_main && user_ids.contains(&p.user_id))
            .map(|p| (p.user_id, p.url.clone()))
            .collect())
    }

    async fn insert_photo(&self, photo: NewPhoto) -> StoreResult<Photo> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&photo.user_id) {
            return Err(StoreError::NotFound);
        }

        let is_main = !state.photos.values().any(|p| p.user_id == photo.user_id);
        let photo = Photo {
            id: photo.id,
            user_id: photo.user_id,
            url: photo.url,
            public_id: photo.public_id,
            is_main,
            created_at: photo.created_at,
        };
        state.photos.insert(photo.id, photo.clone());
        Ok(photo)
    }

    async fn set_main_photo(&self, user_id: Uuid, photo_id: Uuid) -> StoreResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if !owns_photo(&state, user_id, photo_id) {
            return Err(StoreError::NotFound);
        }

        for photo in state.photos.values_mut().filter(|p| p.user_id == user_id) {
            photo.is_main = photo.id == photo_id;
        }
        Ok(())
    }

    async fn delete_photo(&self, user_id: Uuid, photo_id: Uuid) -> StoreResult<()> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if !owns_photo(&state, user_id, photo_id) {
            return Err(StoreError::NotFound);
        }

        state.photos.remove(&photo_id);
        Ok(())
    }

    async fn find_like(&self, source_user_id: Uuid, liked_user_id: Uuid) -> StoreResult<Option<Like>> {
        let state = self.state.lock().await;
        Ok(state.likes.get(&(source_user_id, liked_user_id)).cloned())
    }

    async fn insert_like(&self, like: NewLike) -> StoreResult<Like> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let key = (like.source_user_id, like.liked_user_id);
        if state.likes.contains_key(&key) {
            return Err(StoreError::UniqueViolation);
        }

        let like = Like {
            source_user_id: like.source_user_id,
            liked_user_id: like.liked_user_id,
            created_at: like.created_at,
        };
        state.likes.insert(key, like.clone());
        Ok(like)
    }

    async fn liked_users(
        &self,
        user_id: Uuid,
        predicate: LikePredicate,
        page: &PaginationParams,
    ) -> StoreResult<Page<User>> {
        let state = self.state.lock().await;
        let mut users: Vec<User> = state
            .likes
            .values()
            .filter_map(|like| match predicate {
                LikePredicate::Liked if like.source_user_id == user_id => Some(like.liked_user_id),
                LikePredicate::LikedBy if like.liked_user_id == user_id => Some(like.source_user_id),
                _ => None,
            })
            .filter_map(|id| state.users.get(&id).cloned())
            .collect();
        users.sort_by(|a, b| a.username.cmp(&b.username));

        Ok(paginate(users, page))
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        if !state.users.contains_key(&message.sender_id) || !state.users.contains_key(&message.recipient_id) {
            return Err(StoreError::NotFound);
        }

        let message = Message {
            id: message.id,
            sender_id: message.sender_id,
            sender_username: message.sender_username,
            recipient_id: message.recipient_id,
            recipient_username: message.recipient_username,
            content: message.content,
            date_read: None,
            message_sent: message.message_sent,
            sender_deleted: false,
            recipient_deleted: false,
        };
        state.messages.insert(message.id, message.clone());
        Ok(message)
    }

    async fn find_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        Ok(self.state.lock().await.messages.get(&id).cloned())
    }

    async fn delete_message_for(&self, id: Uuid, side: Participant) -> StoreResult<MessageState> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let next = state
            .messages
            .get(&id)
            .ok_or(StoreError::NotFound)?
            .state()
            .delete_by(side);

        if next == MessageState::Purged {
            state.messages.remove(&id);
        } else if let Some(message) = state.messages.get_mut(&id) {
            message.sender_deleted = next.sender_deleted();
            message.recipient_deleted = next.recipient_deleted();
        }
        Ok(next)
    }

    async fn messages_for_user(
        &self,
        username: &str,
        container: MessageContainer,
        page: &PaginationParams,
    ) -> StoreResult<Page<Message>> {
        let state = self.state.lock().await;
        let mut messages: Vec<Message> = state
            .messages
            .values()
            .filter(|m| container.includes(m, username))
            .cloned()
            .collect();
        messages.sort_by(|a, b| b.message_sent.cmp(&a.message_sent).then_with(|| b.id.cmp(&a.id)));

        Ok(paginate(messages, page))
    }

    async fn message_thread(
        &self,
        username: &str,
        other_username: &str,
        read_at: DateTime<Utc>,
    ) -> StoreResult<Vec<Message>> {
        self.check_writable()?;
        let mut state = self.state.lock().await;
        let in_thread = |m: &Message| {
            (m.recipient_username == username && m.sender_username == other_username)
                || (m.sender_username == username && m.recipient_username == other_username)
        };

        for message in state.messages.values_mut() {
            if in_thread(message)
                && message.recipient_username == username
                && !message.recipient_deleted
                && message.date_read.is_none()
            {
                message.date_read = Some(read_at);
            }
        }

        let mut thread: Vec<Message> = state
            .messages
            .values()
            .filter(|m| in_thread(m) && MessageContainer::All.includes(m, username))
            .cloned()
            .collect();
        thread.sort_by(|a, b| a.message_sent.cmp(&b.message_sent).then_with(|| a.id.cmp(&b.id)));
        Ok(thread)
    }
}
