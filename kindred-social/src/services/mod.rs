pub mod likes_service;
pub mod member_service;
pub mod message_service;
pub mod photo_service;

use chrono::{NaiveDate, Utc};
use kindred_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::User;
use crate::store::SocialStore;

fn user_not_found() -> AppError {
    AppError::new(ErrorCode::UserNotFound, "user not found")
}

/// Resolves a user by username, compared case-insensitively.
pub(crate) async fn require_user(store: &dyn SocialStore, username: &str) -> AppResult<User> {
    store
        .find_user_by_username(&username.to_lowercase())
        .await
        .map_err(AppError::read_failed)?
        .ok_or_else(user_not_found)
}

pub(crate) async fn require_user_by_id(store: &dyn SocialStore, id: uuid::Uuid) -> AppResult<User> {
    store
        .find_user_by_id(id)
        .await
        .map_err(AppError::read_failed)?
        .ok_or_else(user_not_found)
}

pub(crate) fn today() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
pub mod testing {
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    use chrono::{Months, NaiveDate, Utc};
    use uuid::Uuid;

    use super::photo_service::{PhotoUploader, UploadedPhoto};
    use crate::models::{NewUser, User};
    use crate::store::SocialStore;

    /// Birth date for someone who turns `age` today.
    pub fn born_years_ago(age: u32) -> NaiveDate {
        Utc::now()
            .date_naive()
            .checked_sub_months(Months::new(age * 12))
            .unwrap()
    }

    pub async fn seed_user(store: &dyn SocialStore, username: &str, gender: &str, age: u32) -> User {
        let now = Utc::now();
        store
            .insert_user(NewUser {
                id: Uuid::now_v7(),
                username: username.to_lowercase(),
                known_as: Some(username.to_string()),
                gender: gender.into(),
                date_of_birth: born_years_ago(age),
                city: Some("Lyon".into()),
                country: Some("France".into()),
                created_at: now,
                last_active: now,
            })
            .await
            .unwrap()
    }

    /// Upload service double that records deletions and can be told to fail.
    #[derive(Default)]
    pub struct FakeUploader {
        pub fail_uploads: AtomicBool,
        pub fail_deletes: AtomicBool,
        pub deleted: Mutex<Vec<String>>,
    }

    impl FakeUploader {
        pub fn deleted(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }
    }

    #[async_trait::async_trait]
    impl PhotoUploader for FakeUploader {
        async fn upload(&self, user_id: Uuid, _bytes: Vec<u8>, _content_type: &str) -> anyhow::Result<UploadedPhoto> {
            if self.fail_uploads.load(Ordering::SeqCst) {
                anyhow::bail!("bucket unavailable");
            }
            let public_id = format!("users/{user_id}/{}", Uuid::now_v7());
            Ok(UploadedPhoto {
                url: format!("http://photos.test/{public_id}"),
                public_id,
            })
        }

        async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
            if self.fail_deletes.load(Ordering::SeqCst) {
                anyhow::bail!("bucket unavailable");
            }
            self.deleted.lock().unwrap().push(public_id.to_string());
            Ok(())
        }
    }
}
