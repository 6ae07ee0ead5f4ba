use axum::extract::multipart::MultipartError;
use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use std::sync::Arc;
use uuid::Uuid;

use kindred_shared::errors::{AppError, AppResult, ErrorCode};
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::{ApiResponse, Empty};

use crate::models::Photo;
use crate::services::photo_service;
use crate::AppState;

pub const MAX_PHOTO_BYTES: usize = 10 * 1024 * 1024;

fn multipart_failure(err: MultipartError) -> AppError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return AppError::new(ErrorCode::PayloadTooLarge, "photo exceeds the 10 MiB upload limit");
    }
    AppError::new(ErrorCode::PhotoUploadFailed, format!("failed to read multipart: {err}"))
}

fn photo_id(raw: &str) -> AppResult<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::new(ErrorCode::PhotoNotFound, "photo not found"))
}

/// POST /users/photos - multipart body with a `file` part
pub async fn upload_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<Photo>>> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(multipart_failure)?
    {
        if field.name() != Some("file") {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();

        let data = field.bytes().await.map_err(multipart_failure)?;

        let photo = photo_service::add_photo(
            state.store.as_ref(),
            state.photos.as_ref(),
            user.id,
            data.to_vec(),
            &content_type,
        )
        .await?;

        return Ok(Json(ApiResponse::ok(photo)));
    }

    Err(AppError::new(ErrorCode::PhotoUploadFailed, "no file provided"))
}

pub async fn set_main_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    photo_service::set_main_photo(state.store.as_ref(), user.id, photo_id(&id)?).await?;
    Ok(Json(ApiResponse::done("main photo updated")))
}

pub async fn delete_photo(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    photo_service::delete_photo(state.store.as_ref(), state.photos.as_ref(), user.id, photo_id(&id)?).await?;
    Ok(Json(ApiResponse::done("photo deleted")))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{header, Method, Request, StatusCode};

    use super::super::test_support::{bearer, read, send, TestApp};
    use crate::store::SocialStore;

    const BOUNDARY: &str = "kindred-test-boundary";

    fn multipart_request(token: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"me.jpg\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/users/photos")
            .header(header::AUTHORIZATION, token)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn upload_set_main_and_delete() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;
        let token = bearer(&adam);

        let (status, _, first) = read(&app.router, multipart_request(&token, "image/jpeg", b"jpeg")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(first["data"]["is_main"], true);
        assert!(first["data"].get("public_id").is_none());

        let (_, _, second) = read(&app.router, multipart_request(&token, "image/png", b"png")).await;
        assert_eq!(second["data"]["is_main"], false);
        let first_id = first["data"]["id"].as_str().unwrap();
        let second_id = second["data"]["id"].as_str().unwrap();

        let (status, _, body) = send(&app.router, Method::DELETE, &format!("/users/photos/{first_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E2007");

        let (status, _, _) = send(&app.router, Method::PUT, &format!("/users/photos/{second_id}/main"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, _) = send(&app.router, Method::DELETE, &format!("/users/photos/{first_id}"), Some(&token), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(app.uploader.deleted().len(), 1);
    }

    #[tokio::test]
    async fn unsupported_type_is_rejected() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;

        let (status, _, body) = read(&app.router, multipart_request(&bearer(&adam), "text/plain", b"hi")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E2004");
    }

    #[tokio::test]
    async fn oversized_upload_is_payload_too_large() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;
        let bytes = vec![0u8; super::MAX_PHOTO_BYTES + 1];

        let (status, _, body) = read(&app.router, multipart_request(&bearer(&adam), "image/jpeg", &bytes)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(body["error"]["code"], "E0009");
        assert!(app.store.photos_for_user(adam.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn malformed_photo_id_is_not_found() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;
        let token = bearer(&adam);

        let (status, _, body) = send(&app.router, Method::PUT, "/users/photos/not-a-uuid/main", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E2005");

        let (status, _, body) = send(&app.router, Method::DELETE, "/users/photos/not-a-uuid", Some(&token), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E2005");
    }
}
