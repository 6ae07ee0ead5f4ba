use chrono::{DateTime, Datelike, Months, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::schema::{likes, messages, photos, users};

// --- User ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = users)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub known_as: Option<String>,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub city: Option<String>,
    pub country: Option<String>,
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = users)]
pub struct NewUser {
    pub id: Uuid,
    pub username: String,
    pub known_as: Option<String>,
    pub gender: String,
    pub date_of_birth: NaiveDate,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

/// Editable profile fields. Username, gender and birth date are fixed at registration.
#[derive(Debug, AsChangeset, Deserialize, Validate, Default, Clone)]
#[diesel(table_name = users)]
pub struct UpdateUser {
    #[validate(length(min = 1, max = 64))]
    pub known_as: Option<String>,
    #[validate(length(max = 2000))]
    pub introduction: Option<String>,
    #[validate(length(max = 2000))]
    pub looking_for: Option<String>,
    #[validate(length(max = 2000))]
    pub interests: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    #[validate(length(max = 100))]
    pub country: Option<String>,
}

impl UpdateUser {
    pub fn is_empty(&self) -> bool {
        self.known_as.is_none()
            && self.introduction.is_none()
            && self.looking_for.is_none()
            && self.interests.is_none()
            && self.city.is_none()
            && self.country.is_none()
    }

    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.known_as {
            user.known_as = Some(v.clone());
        }
        if let Some(v) = &self.introduction {
            user.introduction = Some(v.clone());
        }
        if let Some(v) = &self.looking_for {
            user.looking_for = Some(v.clone());
        }
        if let Some(v) = &self.interests {
            user.interests = Some(v.clone());
        }
        if let Some(v) = &self.city {
            user.city = Some(v.clone());
        }
        if let Some(v) = &self.country {
            user.country = Some(v.clone());
        }
    }
}

/// Binary gender domain used for the default discovery filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "male" => Some(Self::Male),
            "female" => Some(Self::Female),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
        }
    }

    pub fn opposite(&self) -> Self {
        match self {
            Self::Male => Self::Female,
            Self::Female => Self::Male,
        }
    }
}

/// Whole years between `date_of_birth` and `today`.
pub fn age_on(date_of_birth: NaiveDate, today: NaiveDate) -> u32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age.max(0) as u32
}

/// Birth-date window for an inclusive age range: `(born_after, born_on_or_before)`.
/// A user is within `[min_age, max_age]` iff `born_after < dob <= born_on_or_before`.
pub fn birth_date_bounds(min_age: u32, max_age: u32, today: NaiveDate) -> (NaiveDate, NaiveDate) {
    let years_before = |years: u32| {
        today
            .checked_sub_months(Months::new(years.saturating_mul(12)))
            .unwrap_or(NaiveDate::MIN)
    };
    (years_before(max_age.saturating_add(1)), years_before(min_age))
}

// --- Photo ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = photos)]
pub struct Photo {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    #[serde(skip_serializing)]
    pub public_id: Option<String>,
    pub is_main: bool,
    pub created_at: DateTime<Utc>,
}

/// `is_main` is decided by the store when the photo is inserted.
#[derive(Debug, Clone)]
pub struct NewPhoto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub public_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = photos)]
pub struct PhotoRow<'a> {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: &'a str,
    pub public_id: Option<&'a str>,
    pub is_main: bool,
    pub created_at: DateTime<Utc>,
}

// --- Like ---

#[derive(Debug, Queryable, Selectable, Serialize, Clone, PartialEq)]
#[diesel(table_name = likes)]
pub struct Like {
    pub source_user_id: Uuid,
    pub liked_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = likes)]
pub struct NewLike {
    pub source_user_id: Uuid,
    pub liked_user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Direction of a like listing, relative to the requesting user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum LikePredicate {
    /// Users the requester liked.
    #[default]
    #[serde(rename = "liked")]
    Liked,
    /// Users who liked the requester.
    #[serde(rename = "likedBy")]
    LikedBy,
}

// --- Message ---

#[derive(Debug, Queryable, Selectable, Identifiable, Serialize, Clone, PartialEq)]
#[diesel(table_name = messages)]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub recipient_id: Uuid,
    pub recipient_username: String,
    pub content: String,
    pub date_read: Option<DateTime<Utc>>,
    pub message_sent: DateTime<Utc>,
    pub sender_deleted: bool,
    pub recipient_deleted: bool,
}

#[derive(Debug, Insertable, Clone)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub recipient_id: Uuid,
    pub recipient_username: String,
    pub content: String,
    pub message_sent: DateTime<Utc>,
}

impl Message {
    pub fn state(&self) -> MessageState {
        MessageState::from_flags(self.sender_deleted, self.recipient_deleted)
    }

    /// Which side of the conversation `username` is, judged by the snapshots taken at creation.
    pub fn participant(&self, username: &str) -> Option<Participant> {
        if self.sender_username.eq_ignore_ascii_case(username) {
            Some(Participant::Sender)
        } else if self.recipient_username.eq_ignore_ascii_case(username) {
            Some(Participant::Recipient)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Participant {
    Sender,
    Recipient,
}

/// Per-message visibility lifecycle.
///
/// | state               | sender_deleted | recipient_deleted |
/// |---------------------|----------------|-------------------|
/// | Active              | false          | false             |
/// | HiddenFromSender    | true           | false             |
/// | HiddenFromRecipient | false          | true              |
/// | Purged              | true           | true              |
///
/// `Purged` is terminal: the row is removed in the same commit that reaches it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageState {
    Active,
    HiddenFromSender,
    HiddenFromRecipient,
    Purged,
}

impl MessageState {
    pub fn from_flags(sender_deleted: bool, recipient_deleted: bool) -> Self {
        match (sender_deleted, recipient_deleted) {
            (false, false) => Self::Active,
            (true, false) => Self::HiddenFromSender,
            (false, true) => Self::HiddenFromRecipient,
            (true, true) => Self::Purged,
        }
    }

    pub fn sender_deleted(self) -> bool {
        matches!(self, Self::HiddenFromSender | Self::Purged)
    }

    pub fn recipient_deleted(self) -> bool {
        matches!(self, Self::HiddenFromRecipient | Self::Purged)
    }

    /// Hide the message from `side`. Idempotent.
    pub fn delete_by(self, side: Participant) -> Self {
        match side {
            Participant::Sender => Self::from_flags(true, self.recipient_deleted()),
            Participant::Recipient => Self::from_flags(self.sender_deleted(), true),
        }
    }

    pub fn is_visible_to(self, side: Participant) -> bool {
        match side {
            Participant::Sender => !self.sender_deleted(),
            Participant::Recipient => !self.recipient_deleted(),
        }
    }
}

/// Which messages a listing returns, from the requester's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageContainer {
    /// Sent and received, minus those the requester hid.
    #[default]
    All,
    Inbox,
    Outbox,
    /// Inbox messages not yet read.
    Unread,
}

impl MessageContainer {
    /// Whether `message` belongs in this container for `username`.
    pub fn includes(self, message: &Message, username: &str) -> bool {
        let state = message.state();
        let received = message.recipient_username == username
            && state.is_visible_to(Participant::Recipient);
        let sent = message.sender_username == username
            && state.is_visible_to(Participant::Sender);

        match self {
            Self::All => received || sent,
            Self::Inbox => received,
            Self::Outbox => sent,
            Self::Unread => received && message.date_read.is_none(),
        }
    }
}

// --- Discovery ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum MemberOrder {
    #[default]
    #[serde(rename = "lastActive")]
    LastActive,
    #[serde(rename = "created")]
    Created,
}

// --- Summaries ---

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MemberSummary {
    pub id: Uuid,
    pub username: String,
    pub known_as: Option<String>,
    pub age: u32,
    pub photo_url: Option<String>,
    pub gender: String,
    pub city: Option<String>,
    pub country: Option<String>,
    pub created_at: DateTime<Utc>,
    pub last_active: DateTime<Utc>,
}

impl MemberSummary {
    pub fn from_user(user: &User, photo_url: Option<String>, today: NaiveDate) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            known_as: user.known_as.clone(),
            age: age_on(user.date_of_birth, today),
            photo_url,
            gender: user.gender.clone(),
            city: user.city.clone(),
            country: user.country.clone(),
            created_at: user.created_at,
            last_active: user.last_active,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MemberDetail {
    #[serde(flatten)]
    pub summary: MemberSummary,
    pub introduction: Option<String>,
    pub looking_for: Option<String>,
    pub interests: Option<String>,
    pub photos: Vec<Photo>,
}

#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct LikeSummary {
    pub id: Uuid,
    pub username: String,
    pub known_as: Option<String>,
    pub age: u32,
    pub photo_url: Option<String>,
    pub city: Option<String>,
}

impl LikeSummary {
    pub fn from_user(user: &User, photo_url: Option<String>, today: NaiveDate) -> Self {
        Self {
            id: user.id,
            username: user.username.clone(),
            known_as: user.known_as.clone(),
            age: age_on(user.date_of_birth, today),
            photo_url,
            city: user.city.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MessageSummary {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub sender_username: String,
    pub recipient_id: Uuid,
    pub recipient_username: String,
    pub content: String,
    pub date_read: Option<DateTime<Utc>>,
    pub message_sent: DateTime<Utc>,
}

impl From<&Message> for MessageSummary {
    fn from(message: &Message) -> Self {
        Self {
            id: message.id,
            sender_id: message.sender_id,
            sender_username: message.sender_username.clone(),
            recipient_id: message.recipient_id,
            recipient_username: message.recipient_username.clone(),
            content: message.content.clone(),
            date_read: message.date_read,
            message_sent: message.message_sent,
        }
    }
}
