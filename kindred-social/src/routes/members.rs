use axum::extract::{Path, Query, State};
use axum::Json;
use std::sync::Arc;
use validator::Validate;

use kindred_shared::errors::AppResult;
use kindred_shared::types::auth::AuthUser;
use kindred_shared::types::pagination::{PagedJson, PaginationParams};
use kindred_shared::types::ApiResponse;

use crate::models::{MemberDetail, MemberSummary, UpdateUser};
use crate::services::member_service::{self, MemberQuery};
use crate::AppState;

/// GET /users?gender=&min_age=&max_age=&order_by=lastActive|created
pub async fn list_members(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Query(query): Query<MemberQuery>,
    Query(page): Query<PaginationParams>,
) -> AppResult<PagedJson<MemberSummary>> {
    let members = member_service::get_members(state.store.as_ref(), &user.username, &query, &page).await?;
    Ok(PagedJson(members))
}

pub async fn get_member(
    _user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(username): Path<String>,
) -> AppResult<Json<ApiResponse<MemberDetail>>> {
    let member = member_service::get_member(state.store.as_ref(), &username).await?;
    Ok(Json(ApiResponse::ok(member)))
}

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(changes): Json<UpdateUser>,
) -> AppResult<Json<ApiResponse<MemberDetail>>> {
    changes.validate()?;

    let member = member_service::update_member(state.store.as_ref(), user.id, changes).await?;
    Ok(Json(ApiResponse::ok(member)))
}

#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    use super::super::test_support::{bearer, send, TestApp};

    #[tokio::test]
    async fn discovery_defaults_to_opposite_gender() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;
        app.user("bruno", "male").await;
        app.user("chloe", "female").await;

        let (status, headers, body) = send(&app.router, Method::GET, "/users", Some(&bearer(&adam)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_count"], 1);
        assert_eq!(body["data"]["items"][0]["username"], "chloe");
        assert!(headers.contains_key("pagination"));
    }

    #[tokio::test]
    async fn oversized_page_is_clamped() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;

        let (status, _, body) = send(&app.router, Method::GET, "/users?page_size=1000&page=4", Some(&bearer(&adam)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["page_size"], 50);
        assert_eq!(body["data"]["items"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn profile_update_shows_in_detail() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;

        let (status, _, _) = send(
            &app.router,
            Method::PUT,
            "/users",
            Some(&bearer(&adam)),
            Some(json!({ "introduction": "hello there" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let (status, _, body) = send(&app.router, Method::GET, "/users/Adam", Some(&bearer(&adam)), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["introduction"], "hello there");
        assert_eq!(body["data"]["username"], "adam");
    }

    #[tokio::test]
    async fn unknown_member_is_not_found() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;

        let (status, _, body) = send(&app.router, Method::GET, "/users/ghost", Some(&bearer(&adam)), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "E2001");
    }
}
