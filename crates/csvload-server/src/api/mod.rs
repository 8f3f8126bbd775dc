//! HTTP surface: liveness, database health and the ingestion trigger

pub mod routes;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::IngestSettings;
use crate::ingest::users::{PgUserStore, UsersPipeline};
use crate::middleware;

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub pipeline: Arc<UsersPipeline>,
    pub ingest: IngestSettings,
    /// Held by the spawned run task; a second upload is refused while it is taken
    pub run_lock: Arc<Mutex<()>>,
}

impl AppState {
    pub fn new(db: PgPool, ingest: IngestSettings) -> Self {
        let store = Arc::new(PgUserStore::new(db.clone()));
        let pipeline = UsersPipeline::new(store).with_batch_size(ingest.batch_size);

        Self {
            db,
            pipeline: Arc::new(pipeline),
            ingest,
            run_lock: Arc::new(Mutex::new(())),
        }
    }
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(routes::root))
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .with_state(state)
        .layer(middleware::tracing_layer())
}
