use std::collections::HashMap;

use chrono::{DateTime, Utc};
use diesel::pg::{Pg, PgConnection};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use kindred_shared::clients::db::DbPool;
use kindred_shared::types::pagination::PaginationParams;
use uuid::Uuid;

use super::{MemberFilter, Page, SocialStore, StoreError, StoreResult};
use crate::models::{
    Like, LikePredicate, MemberOrder, Message, MessageContainer, MessageState, NewLike,
    NewMessage, NewPhoto, NewUser, Participant, Photo, PhotoRow, UpdateUser, User,
};
use crate::schema::{likes, messages, photos, users};

impl From<DieselError> for StoreError {
    fn from(err: DieselError) -> Self {
        match err {
            DieselError::NotFound => StoreError::NotFound,
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => StoreError::UniqueViolation,
            other => StoreError::Backend(other.into()),
        }
    }
}

/// OFFSET/LIMIT pair for a page; offsets past `i64::MAX` are clamped rather than wrapped negative.
fn window(page: &PaginationParams) -> (i64, i64) {
    let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
    (offset, page.limit() as i64)
}

/// Postgres-backed store. Diesel is synchronous, so every call checks out a pooled
/// connection on the blocking thread pool.
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn run<T, F>(&self, f: F) -> StoreResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut PgConnection) -> StoreResult<T> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let mut conn = pool.get().map_err(|e| StoreError::Backend(e.into()))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::Backend(e.into()))?
    }
}

fn member_query(filter: &MemberFilter) -> users::BoxedQuery<'_, Pg> {
    let mut query = users::table
        .into_boxed()
        .filter(users::username.ne(&filter.exclude_username))
        .filter(users::date_of_birth.gt(filter.born_after))
        .filter(users::date_of_birth.le(filter.born_on_or_before));

    if let Some(gender) = &filter.gender {
        query = query.filter(users::gender.eq(gender));
    }
    query
}

fn container_query(username: &str, container: MessageContainer) -> messages::BoxedQuery<'_, Pg> {
    let received = messages::recipient_username
        .eq(username)
        .and(messages::recipient_deleted.eq(false));
    let sent = messages::sender_username
        .eq(username)
        .and(messages::sender_deleted.eq(false));

    let query = messages::table.into_boxed();
    match container {
        MessageContainer::All => query.filter(received.or(sent)),
        MessageContainer::Inbox => query.filter(received),
        MessageContainer::Outbox => query.filter(sent),
        MessageContainer::Unread => query.filter(received.and(messages::date_read.is_null())),
    }
}

/// Serializes concurrent photo changes for one user.
fn lock_user(conn: &mut PgConnection, user_id: Uuid) -> StoreResult<()> {
    users::table
        .find(user_id)
        .select(users::id)
        .for_update()
        .first::<Uuid>(conn)?;
    Ok(())
}

#[async_trait::async_trait]
impl SocialStore for PgStore {
    async fn ping(&self) -> StoreResult<()> {
        self.run(|conn| {
            diesel::sql_query("SELECT 1").execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn insert_user(&self, user: NewUser) -> StoreResult<User> {
        self.run(move |conn| {
            let user = diesel::insert_into(users::table)
                .values(&user)
                .get_result::<User>(conn)?;
            Ok(user)
        })
        .await
    }

    async fn find_user_by_id(&self, id: Uuid) -> StoreResult<Option<User>> {
        self.run(move |conn| Ok(users::table.find(id).first::<User>(conn).optional()?))
            .await
    }

    async fn find_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let username = username.to_string();
        self.run(move |conn| {
            Ok(users::table
                .filter(users::username.eq(&username))
                .first::<User>(conn)
                .optional()?)
        })
        .await
    }

    async fn update_user(&self, id: Uuid, changes: UpdateUser) -> StoreResult<User> {
        self.run(move |conn| {
            if changes.is_empty() {
                return Ok(users::table.find(id).first::<User>(conn)?);
            }
            Ok(diesel::update(users::table.find(id))
                .set(&changes)
                .get_result::<User>(conn)?)
        })
        .await
    }

    async fn touch_last_active(&self, id: Uuid, at: DateTime<Utc>) -> StoreResult<()> {
        self.run(move |conn| {
            diesel::update(users::table.find(id))
                .set(users::last_active.eq(at))
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    async fn query_members(&self, filter: &MemberFilter, page: &PaginationParams) -> StoreResult<Page<User>> {
        let filter = filter.clone();
        let (offset, limit) = window(page);
        self.run(move |conn| {
            let total = member_query(&filter).count().get_result::<i64>(conn)?;

            let ordered = match filter.order_by {
                MemberOrder::LastActive => member_query(&filter).order(users::last_active.desc()),
                MemberOrder::Created => member_query(&filter).order(users::created_at.desc()),
            };
            let items = ordered
                .then_order_by(users::username.asc())
                .offset(offset)
                .limit(limit)
                .load::<User>(conn)?;

            Ok(Page { items, total: total as u64 })
        })
        .await
    }

    async fn photos_for_user(&self, user_id: Uuid) -> StoreResult<Vec<Photo>> {
        self.run(move |conn| {
            Ok(photos::table
                .filter(photos::user_id.eq(user_id))
                .order(photos::created_at.asc())
                .load::<Photo>(conn)?)
        })
        .await
    }

    async fn main_photo_urls(&self, user_ids: &[Uuid]) -> StoreResult<HashMap<Uuid, String>> {
        if user_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let user_ids = user_ids.to_vec();
        self.run(move |conn| {
            let rows = photos::table
                .filter(photos::user_id.eq_any(user_ids))
                .filter(photos::is_main.eq(true))
                .select((photos::user_id, photos::url))
                .load::<(Uuid, String)>(conn)?;
            Ok(rows.into_iter().collect())
        })
        .await
    }

    async fn insert_photo(&self, photo: NewPhoto) -> StoreResult<Photo> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                lock_user(conn, photo.user_id)?;

                let existing = photos::table
                    .filter(photos::user_id.eq(photo.user_id))
                    .count()
                    .get_result::<i64>(conn)?;

                let row = PhotoRow {
                    id: photo.id,
                    user_id: photo.user_id,
                    url: &photo.url,
                    public_id: photo.public_id.as_deref(),
                    is_main: existing == 0,
                    created_at: photo.created_at,
                };
                Ok(diesel::insert_into(photos::table)
                    .values(&row)
                    .get_result::<Photo>(conn)?)
            })
        })
        .await
    }

    async fn set_main_photo(&self, user_id: Uuid, photo_id: Uuid) -> StoreResult<()> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                lock_user(conn, user_id)?;

                let owned = photos::table
                    .filter(photos::id.eq(photo_id))
                    .filter(photos::user_id.eq(user_id))
                    .count()
                    .get_result::<i64>(conn)?;
                if owned == 0 {
                    return Err(StoreError::NotFound);
                }

                // clear first: the partial unique index allows one main photo per user
                diesel::update(
                    photos::table
                        .filter(photos::user_id.eq(user_id))
                        .filter(photos::is_main.eq(true)),
                )
                .set(photos::is_main.eq(false))
                .execute(conn)?;

                diesel::update(photos::table.find(photo_id))
                    .set(photos::is_main.eq(true))
                    .execute(conn)?;
                Ok(())
            })
        })
        .await
    }

    async fn delete_photo(&self, user_id: Uuid, photo_id: Uuid) -> StoreResult<()> {
        self.run(move |conn| {
            let deleted = diesel::delete(
                photos::table
                    .filter(photos::id.eq(photo_id))
                    .filter(photos::user_id.eq(user_id)),
            )
            .execute(conn)?;
            if deleted == 0 {
                return Err(StoreError::NotFound);
            }
            Ok(())
        })
        .await
    }

    async fn find_like(&self, source_user_id: Uuid, liked_user_id: Uuid) -> StoreResult<Option<Like>> {
        self.run(move |conn| {
            Ok(likes::table
                .find((source_user_id, liked_user_id))
                .first::<Like>(conn)
                .optional()?)
        })
        .await
    }

    async fn insert_like(&self, like: NewLike) -> StoreResult<Like> {
        self.run(move |conn| {
            Ok(diesel::insert_into(likes::table)
                .values(&like)
                .get_result::<Like>(conn)?)
        })
        .await
    }

    async fn liked_users(
        &self,
        user_id: Uuid,
        predicate: LikePredicate,
        page: &PaginationParams,
    ) -> StoreResult<Page<User>> {
        let (offset, limit) = window(page);
        self.run(move |conn| {
            let (total, items) = match predicate {
                LikePredicate::Liked => {
                    let total = likes::table
                        .filter(likes::source_user_id.eq(user_id))
                        .count()
                        .get_result::<i64>(conn)?;
                    let items = users::table
                        .inner_join(likes::table.on(likes::liked_user_id.eq(users::id)))
                        .filter(likes::source_user_id.eq(user_id))
                        .order(users::username.asc())
                        .select(User::as_select())
                        .offset(offset)
                        .limit(limit)
                        .load::<User>(conn)?;
                    (total, items)
                }
                LikePredicate::LikedBy => {
                    let total = likes::table
                        .filter(likes::liked_user_id.eq(user_id))
                        .count()
                        .get_result::<i64>(conn)?;
                    let items = users::table
                        .inner_join(likes::table.on(likes::source_user_id.eq(users::id)))
                        .filter(likes::liked_user_id.eq(user_id))
                        .order(users::username.asc())
                        .select(User::as_select())
                        .offset(offset)
                        .limit(limit)
                        .load::<User>(conn)?;
                    (total, items)
                }
            };

            Ok(Page { items, total: total as u64 })
        })
        .await
    }

    async fn insert_message(&self, message: NewMessage) -> StoreResult<Message> {
        self.run(move |conn| {
            Ok(diesel::insert_into(messages::table)
                .values(&message)
                .get_result::<Message>(conn)?)
        })
        .await
    }

    async fn find_message(&self, id: Uuid) -> StoreResult<Option<Message>> {
        self.run(move |conn| Ok(messages::table.find(id).first::<Message>(conn).optional()?))
            .await
    }

    async fn delete_message_for(&self, id: Uuid, side: Participant) -> StoreResult<MessageState> {
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                let message = messages::table
                    .find(id)
                    .for_update()
                    .first::<Message>(conn)
                    .optional()?
                    .ok_or(StoreError::NotFound)?;

                let next = message.state().delete_by(side);
                if next == MessageState::Purged {
                    diesel::delete(messages::table.find(id)).execute(conn)?;
                } else {
                    diesel::update(messages::table.find(id))
                        .set((
                            messages::sender_deleted.eq(next.sender_deleted()),
                            messages::recipient_deleted.eq(next.recipient_deleted()),
                        ))
                        .execute(conn)?;
                }
                Ok(next)
            })
        })
        .await
    }

    async fn messages_for_user(
        &self,
        username: &str,
        container: MessageContainer,
        page: &PaginationParams,
    ) -> StoreResult<Page<Message>> {
        let username = username.to_string();
        let (offset, limit) = window(page);
        self.run(move |conn| {
            let total = container_query(&username, container)
                .count()
                .get_result::<i64>(conn)?;

            let items = container_query(&username, container)
                .order(messages::message_sent.desc())
                .then_order_by(messages::id.desc())
                .offset(offset)
                .limit(limit)
                .load::<Message>(conn)?;

            Ok(Page { items, total: total as u64 })
        })
        .await
    }

    async fn message_thread(
        &self,
        username: &str,
        other_username: &str,
        read_at: DateTime<Utc>,
    ) -> StoreResult<Vec<Message>> {
        let username = username.to_string();
        let other = other_username.to_string();
        self.run(move |conn| {
            conn.transaction::<_, StoreError, _>(|conn| {
                diesel::update(
                    messages::table
                        .filter(messages::recipient_username.eq(&username))
                        .filter(messages::sender_username.eq(&other))
                        .filter(messages::date_read.is_null())
                        .filter(messages::recipient_deleted.eq(false)),
                )
                .set(messages::date_read.eq(Some(read_at)))
                .execute(conn)?;

                let received = messages::recipient_username
                    .eq(&username)
                    .and(messages::sender_username.eq(&other))
                    .and(messages::recipient_deleted.eq(false));
                let sent = messages::sender_username
                    .eq(&username)
                    .and(messages::recipient_username.eq(&other))
                    .and(messages::sender_deleted.eq(false));

                Ok(messages::table
                    .filter(received.or(sent))
                    .order(messages::message_sent.asc())
                    .then_order_by(messages::id.asc())
                    .load::<Message>(conn)?)
            })
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_never_goes_negative() {
        assert_eq!(window(&PaginationParams::new(3, 10)), (20, 10));
        assert_eq!(window(&PaginationParams::new(u64::MAX, 50)), (i64::MAX, 50));
    }
}
