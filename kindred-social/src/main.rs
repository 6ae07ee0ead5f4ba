use std::sync::Arc;

use kindred_shared::clients::db::create_pool;
use kindred_shared::clients::minio::MinioClient;

use kindred_social::config::{AppConfig, StoreBackend};
use kindred_social::store::{MemoryStore, PgStore, SocialStore};
use kindred_social::{routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kindred_shared::middleware::init_tracing("kindred-social");

    let config = AppConfig::load()?;
    let port = config.port;

    let metrics_handle = kindred_shared::middleware::init_metrics()?;

    let store: Arc<dyn SocialStore> = match config.store {
        StoreBackend::Postgres => {
            let pool = create_pool(&config.database_url, config.db_pool_size)?;
            Arc::new(PgStore::new(pool))
        }
        StoreBackend::Memory => {
            tracing::warn!("using in-memory store, data is lost on restart");
            Arc::new(MemoryStore::new())
        }
    };

    let minio = MinioClient::new(
        &config.minio_endpoint,
        &config.minio_access_key,
        &config.minio_secret_key,
        &config.minio_bucket,
        &config.minio_public_url,
    )
    .await;

    let state = Arc::new(AppState {
        config,
        store,
        photos: Arc::new(minio),
        metrics_handle: Some(metrics_handle),
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{port}");
    tracing::info!(addr = %addr, "kindred-social starting");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
