pub mod config;
pub mod models;
pub mod routes;
pub mod schema;
pub mod services;
pub mod store;

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;

use crate::services::photo_service::PhotoUploader;
use crate::store::SocialStore;

pub struct AppState {
    pub config: config::AppConfig,
    pub store: Arc<dyn SocialStore>,
    pub photos: Arc<dyn PhotoUploader>,
    /// Absent when no Prometheus recorder is installed (tests).
    pub metrics_handle: Option<PrometheusHandle>,
}
