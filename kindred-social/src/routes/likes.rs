use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;

use kindred_shared::errors::AppResult;
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::pagination::{PagedJson, PaginationParams};
use kindred_shared::types::{ApiResponse, Empty};

use crate::models::{LikePredicate, LikeSummary};
use crate::services::likes_service;
use crate::AppState;

/// POST /likes/:username
pub async fn add_like(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    likes_service::add_like(state.store.as_ref(), user.id, &username).await?;
    Ok(Json(ApiResponse::done("like added")))
}

#[derive(Debug, Deserialize)]
pub struct LikesQuery {
    #[serde(default)]
    pub predicate: LikePredicate,
}

/// GET /likes?predicate=liked|likedBy - the requester's own like edges
pub async fn list_likes(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<LikesQuery>,
    Query(page): Query<PaginationParams>,
) -> AppResult<PagedJson<LikeSummary>> {
    let likes = likes_service::get_likes(state.store.as_ref(), user.id, query.predicate, &page).await?;
    Ok(PagedJson(likes))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::super::test_support::{bearer, send, TestApp};

    #[tokio::test]
    async fn like_twice_conflicts() {
        let app = TestApp::new().await;
        let alice = app.user("alice", "female").await;
        app.user("bob", "male").await;

        let (status, _, _) = send(&app.router, Method::POST, "/likes/bob", Some(&bearer(&alice)), None).await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(&app.router, Method::POST, "/likes/bob", Some(&bearer(&alice)), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "E2009");
    }

    #[tokio::test]
    async fn self_like_is_bad_request() {
        let app = TestApp::new().await;
        let alice = app.user("alice", "female").await;

        let (status, _, body) = send(&app.router, Method::POST, "/likes/alice", Some(&bearer(&alice)), None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "E2008");
    }

    #[tokio::test]
    async fn likes_require_a_token() {
        let app = TestApp::new().await;
        let (status, _, _) = send(&app.router, Method::GET, "/likes", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn liked_by_listing_carries_pagination_header() {
        let app = TestApp::new().await;
        let alice = app.user("alice", "female").await;
        let bob = app.user("bob", "male").await;
        send(&app.router, Method::POST, "/likes/alice", Some(&bearer(&bob)), None).await;

        let (status, headers, body) = send(
            &app.router,
            Method::GET,
            "/likes?predicate=likedBy&page=1&page_size=5",
            Some(&bearer(&alice)),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["items"][0]["username"], "bob");
        let header: serde_json::Value =
            serde_json::from_str(headers["pagination"].to_str().unwrap()).unwrap();
        assert_eq!(header["itemsPerPage"], 5);
        assert_eq!(header["totalItems"], 1);
    }
}
