//! csvload Server Library
//!
//! Streams a comma-delimited users file into PostgreSQL and logs an age
//! distribution report after every run.
//!
//! # Overview
//!
//! - **Ingestion**: line-by-line parsing with dot-path header nesting, per-row
//!   validation, batched multi-row inserts inside one transaction per run
//!   ([`ingest::users`])
//! - **Database Management**: PostgreSQL pool and table bootstrap with SQLx ([`db`])
//! - **API Endpoints**: `GET /`, `GET /health` and `POST /upload` ([`api`])
//! - **Configuration**: Environment-based configuration management ([`config`])
//!
//! # Example
//!
//! ```no_run
//! use csvload_server::{api, config::Config, db};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let pool = db::create_pool(&config.database).await?;
//!     db::ensure_users_table(&pool).await?;
//!     let app = api::create_router(api::AppState::new(pool, config.ingest.clone()));
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod ingest;
pub mod middleware;

// Re-export commonly used types
pub use error::AppError;
