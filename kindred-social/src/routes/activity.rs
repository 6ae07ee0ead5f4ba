use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;

use kindred_shared::middleware::OptionalAuthUser;

use crate::services::member_service;
use crate::AppState;

/// Refreshes `last_active` for the authenticated caller once the handler has run.
pub async fn track_activity(
    State(state): State<Arc<AppState>>,
    OptionalAuthUser(user): OptionalAuthUser,
    req: Request,
    next: Next,
) -> Response {
    let response = next.run(req).await;

    if let Some(user) = user {
        member_service::record_activity(state.store.as_ref(), user.id).await;
    }

    response
}

#[cfg(test)]
mod tests {
    use axum::http::Method;

    use super::super::test_support::{bearer, send, TestApp};
    use crate::store::SocialStore;

    #[tokio::test]
    async fn authenticated_requests_refresh_last_active() {
        let app = TestApp::new().await;
        let adam = app.user("adam", "male").await;
        let an_hour_ago = adam.last_active - chrono::Duration::hours(1);
        app.store.touch_last_active(adam.id, an_hour_ago).await.unwrap();

        send(&app.router, Method::GET, "/likes", Some(&bearer(&adam)), None).await;

        let refreshed = app.store.find_user_by_id(adam.id).await.unwrap().unwrap();
        assert!(refreshed.last_active > an_hour_ago);
    }
}
