// router.rs - Route table and backend wiring shared by the server and tests

use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::{AppConfig, StorageBackend};
use crate::database::{DatabaseManager, PgRecycleStore};
use crate::handlers::{self, AppState};
use crate::recycle::{MemoryRecycleStore, RecycleBin, RecycleStore};

pub fn app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .merge(recycle_routes())
        .merge(data_routes())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Router with the CORS layer applied when enabled in config
pub fn app_with_config(state: AppState, config: &AppConfig) -> Router {
    let router = app(state);
    if config.api.enable_cors {
        router.layer(CorsLayer::permissive())
    } else {
        router
    }
}

fn recycle_routes() -> Router<AppState> {
    use handlers::recycle;

    Router::new()
        .route(
            "/api/recycle",
            get(recycle::recycle_list).post(recycle::recycle_capture),
        )
        .route("/api/recycle/:id", get(recycle::recycle_show))
        .route("/api/recycle/:id/restore", post(recycle::recycle_restore))
}

fn data_routes() -> Router<AppState> {
    use handlers::recycle;

    Router::new().route("/api/data/:table/:id", delete(recycle::record_delete))
}

/// Build handler state for the configured storage backend
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    match config.recycle.backend {
        StorageBackend::Postgres => {
            let pool = DatabaseManager::connect(&config.database).await?;
            let store = PgRecycleStore::new(pool.clone());
            store.ensure_schema().await?;
            let bin = RecycleBin::new(Arc::new(store), config.recycle.clone());
            Ok(AppState::new(bin, Some(pool)))
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory recycle bin; entries are lost on restart");
            let store: Arc<dyn RecycleStore> = Arc::new(MemoryRecycleStore::new());
            let bin = RecycleBin::new(store, config.recycle.clone());
            Ok(AppState::new(bin, None))
        }
    }
}
