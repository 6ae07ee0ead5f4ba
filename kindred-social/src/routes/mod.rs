pub mod activity;
pub mod health;
pub mod internal;
pub mod likes;
pub mod members;
pub mod messages;
pub mod photos;

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::{middleware, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use kindred_shared::middleware::metrics_middleware;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/metrics", get(health::metrics))
        .route("/likes", get(likes::list_likes))
        .route("/likes/:username", post(likes::add_like))
        .route("/messages", get(messages::list_messages).post(messages::create_message))
        .route("/messages/thread/:username", get(messages::get_thread))
        .route("/messages/:id", delete(messages::delete_message))
        .route("/users", get(members::list_members).put(members::update_profile))
        .route("/users/:username", get(members::get_member))
        .route("/users/photos", post(photos::upload_photo)
            .layer(DefaultBodyLimit::max(photos::MAX_PHOTO_BYTES)))
        .route("/users/photos/:id/main", put(photos::set_main_photo))
        .route("/users/photos/:id", delete(photos::delete_photo))
        // Service-to-service provisioning (no auth)
        .route("/internal/users", post(internal::register_user))
        .layer(middleware::from_fn_with_state(state.clone(), activity::track_activity))
        .layer(middleware::from_fn(metrics_middleware))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}


#[cfg(test)]
mod tests {
    use axum::http::{Method, StatusCode};

    use super::test_support::{send, TestApp};

    #[tokio::test]
    async fn health_reports_store_check() {
        let app = TestApp::new().await;

        let (status, _, body) = send(&app.router, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["checks"][0]["name"], "store:memory");
    }

    #[tokio::test]
    async fn unreachable_store_reports_generic_message() {
        let app = TestApp::new().await;
        app.store.set_unreachable(true);

        let (status, _, body) = send(&app.router, Method::GET, "/health", None, None).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body["status"], "unhealthy");
        assert_eq!(body["checks"][0]["message"], "store unavailable");
        assert!(!body.to_string().contains("10.0.0.5"));
    }

    #[tokio::test]
    async fn metrics_without_recorder_is_not_found() {
        let app = TestApp::new().await;

        let (status, _, _) = send(&app.router, Method::GET, "/metrics", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
