use chrono::Utc;
use kindred_shared::clients::minio::MinioClient;
use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use uuid::Uuid;

use super::require_user_by_id;
use crate::models::{NewPhoto, Photo};
use crate::store::{SocialStore, StoreError};

/// Result of storing an image: where it is served from and the key to delete it by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedPhoto {
    pub url: String,
    pub public_id: String,
}

#[async_trait::async_trait]
pub trait PhotoUploader: Send + Sync {
    async fn upload(&self, user_id: Uuid, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<UploadedPhoto>;
    async fn delete(&self, public_id: &str) -> anyhow::Result<()>;
}

/// File extension for the accepted image types.
pub fn extension_for(content_type: &str) -> Option<&'static str> {
    match content_type {
        "image/jpeg" | "image/jpg" => Some("jpg"),
        "image/png" => Some("png"),
        "image/webp" => Some("webp"),
        "image/gif" => Some("gif"),
        _ => None,
    }
}

#[async_trait::async_trait]
impl PhotoUploader for MinioClient {
    async fn upload(&self, user_id: Uuid, bytes: Vec<u8>, content_type: &str) -> anyhow::Result<UploadedPhoto> {
        let ext = extension_for(content_type)
            .ok_or_else(|| anyhow::anyhow!("unsupported content type {content_type}"))?;
        let key = format!("users/{user_id}/{}.{ext}", Uuid::now_v7());

        let stored = MinioClient::upload(self, &key, bytes, content_type).await?;
        Ok(UploadedPhoto { url: stored.url, public_id: stored.key })
    }

    async fn delete(&self, public_id: &str) -> anyhow::Result<()> {
        MinioClient::delete(self, public_id).await?;
        Ok(())
    }
}

fn photo_not_found() -> AppError {
    AppError::new(ErrorCode::PhotoNotFound, "photo not found")
}

async fn owned_photo(store: &dyn SocialStore, user_id: Uuid, photo_id: Uuid) -> AppResult<Photo> {
    store
        .photos_for_user(user_id)
        .await
        .map_err(AppError::read_failed)?
        .into_iter()
        .find(|p| p.id == photo_id)
        .ok_or_else(photo_not_found)
}

/// Uploads the image and records it. The first photo a user adds becomes main.
pub async fn add_photo(
    store: &dyn SocialStore,
    uploader: &dyn PhotoUploader,
    user_id: Uuid,
    bytes: Vec<u8>,
    content_type: &str,
) -> AppResult<Photo> {
    if extension_for(content_type).is_none() {
        return Err(AppError::new(
            ErrorCode::PhotoUploadFailed,
            "unsupported image format, accepted: jpeg, png, webp, gif",
        ));
    }
    let user = require_user_by_id(store, user_id).await?;

    let uploaded = uploader.upload(user.id, bytes, content_type).await.map_err(|e| {
        tracing::warn!(user_id = %user.id, error = %e, "photo upload failed");
        AppError::new(ErrorCode::PhotoUploadFailed, "failed to upload photo")
    })?;

    let inserted = store
        .insert_photo(NewPhoto {
            id: Uuid::now_v7(),
            user_id: user.id,
            url: uploaded.url.clone(),
            public_id: Some(uploaded.public_id.clone()),
            created_at: Utc::now(),
        })
        .await;

    match inserted {
        Ok(photo) => {
            tracing::info!(user_id = %user.id, photo_id = %photo.id, is_main = photo.is_main, "photo added");
            Ok(photo)
        }
        Err(e) => {
            if let Err(cleanup) = uploader.delete(&uploaded.public_id).await {
                tracing::warn!(public_id = %uploaded.public_id, error = %cleanup, "orphaned upload left in bucket");
            }
            Err(AppError::write_failed(e))
        }
    }
}

pub async fn set_main_photo(store: &dyn SocialStore, user_id: Uuid, photo_id: Uuid) -> AppResult<()> {
    let photo = owned_photo(store, user_id, photo_id).await?;
    if photo.is_main {
        return Err(AppError::new(ErrorCode::PhotoAlreadyMain, "this is already your main photo"));
    }

    store.set_main_photo(user_id, photo_id).await.map_err(|e| match e {
        StoreError::NotFound => photo_not_found(),
        other => AppError::write_failed(other),
    })?;

    tracing::info!(user_id = %user_id, photo_id = %photo_id, "main photo changed");
    Ok(())
}

pub async fn delete_photo(
    store: &dyn SocialStore,
    uploader: &dyn PhotoUploader,
    user_id: Uuid,
    photo_id: Uuid,
) -> AppResult<()> {
    let photo = owned_photo(store, user_id, photo_id).await?;
    if photo.is_main {
        return Err(AppError::new(ErrorCode::CannotDeleteMainPhoto, "you cannot delete your main photo"));
    }

    if let Some(public_id) = &photo.public_id {
        uploader.delete(public_id).await.map_err(|e| {
            tracing::warn!(photo_id = %photo_id, error = %e, "photo storage delete failed");
            AppError::new(ErrorCode::PhotoUploadFailed, "failed to delete photo")
        })?;
    }

    store.delete_photo(user_id, photo_id).await.map_err(|e| match e {
        StoreError::NotFound => photo_not_found(),
        other => AppError::write_failed(other),
    })?;

    tracing::info!(user_id = %user_id, photo_id = %photo_id, "photo deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::services::testing::{seed_user, FakeUploader};
    use crate::store::MemoryStore;

    const JPEG: &str = "image/jpeg";

    #[tokio::test]
    async fn first_photo_is_main_and_main_moves() {
        let store = MemoryStore::new();
        let uploader = FakeUploader::default();
        let adam = seed_user(&store, "adam", "male", 30).await;

        let first = add_photo(&store, &uploader, adam.id, vec![1], JPEG).await.unwrap();
        let second = add_photo(&store, &uploader, adam.id, vec![2], "image/png").await.unwrap();
        assert!(first.is_main);
        assert!(!second.is_main);

        set_main_photo(&store, adam.id, second.id).await.unwrap();
        let photos = store.photos_for_user(adam.id).await.unwrap();
        let main: Vec<_> = photos.iter().filter(|p| p.is_main).map(|p| p.id).collect();
        assert_eq!(main, [second.id]);

        let err = set_main_photo(&store, adam.id, second.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PhotoAlreadyMain));
    }

    #[tokio::test]
    async fn main_photo_cannot_be_deleted() {
        let store = MemoryStore::new();
        let uploader = FakeUploader::default();
        let adam = seed_user(&store, "adam", "male", 30).await;

        let main = add_photo(&store, &uploader, adam.id, vec![1], JPEG).await.unwrap();
        let extra = add_photo(&store, &uploader, adam.id, vec![2], JPEG).await.unwrap();

        let err = delete_photo(&store, &uploader, adam.id, main.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::CannotDeleteMainPhoto));

        delete_photo(&store, &uploader, adam.id, extra.id).await.unwrap();
        assert_eq!(uploader.deleted(), [extra.public_id.unwrap()]);
        assert_eq!(store.photos_for_user(adam.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_failure_persists_nothing() {
        let store = MemoryStore::new();
        let uploader = FakeUploader::default();
        let adam = seed_user(&store, "adam", "male", 30).await;

        uploader.fail_uploads.store(true, Ordering::SeqCst);
        let err = add_photo(&store, &uploader, adam.id, vec![1], JPEG).await.unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::PhotoUploadFailed));
        assert!(store.photos_for_user(adam.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected_before_upload() {
        let store = MemoryStore::new();
        let uploader = FakeUploader::default();
        let adam = seed_user(&store, "adam", "male", 30).await;

        let err = add_photo(&store, &uploader, adam.id, vec![1], "text/plain").await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PhotoUploadFailed));
    }

    #[tokio::test]
    async fn failed_insert_cleans_up_the_upload() {
        let store = MemoryStore::new();
        let uploader = FakeUploader::default();
        let adam = seed_user(&store, "adam", "male", 30).await;

        store.set_fail_writes(true);
        let err = add_photo(&store, &uploader, adam.id, vec![1], JPEG).await.unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::WriteFailed));
        assert_eq!(uploader.deleted().len(), 1);
    }

    #[tokio::test]
    async fn storage_delete_failure_keeps_the_record() {
        let store = MemoryStore::new();
        let uploader = FakeUploader::default();
        let adam = seed_user(&store, "adam", "male", 30).await;
        add_photo(&store, &uploader, adam.id, vec![1], JPEG).await.unwrap();
        let extra = add_photo(&store, &uploader, adam.id, vec![2], JPEG).await.unwrap();

        uploader.fail_deletes.store(true, Ordering::SeqCst);
        let err = delete_photo(&store, &uploader, adam.id, extra.id).await.unwrap_err();

        assert_eq!(err.code(), Some(ErrorCode::PhotoUploadFailed));
        assert_eq!(store.photos_for_user(adam.id).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn photos_of_other_users_are_not_found() {
        let store = MemoryStore::new();
        let uploader = FakeUploader::default();
        let adam = seed_user(&store, "adam", "male", 30).await;
        let chloe = seed_user(&store, "chloe", "female", 29).await;
        add_photo(&store, &uploader, adam.id, vec![1], JPEG).await.unwrap();
        let extra = add_photo(&store, &uploader, adam.id, vec![2], JPEG).await.unwrap();

        let err = set_main_photo(&store, chloe.id, extra.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PhotoNotFound));

        let err = delete_photo(&store, &uploader, chloe.id, extra.id).await.unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::PhotoNotFound));
    }
}
