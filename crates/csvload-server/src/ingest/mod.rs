//! Data ingestion
//!
//! - **users**: CSV users file into the `users` table, followed by the age
//!   distribution report
//!
//! Runs are started by `POST /upload` or by the `csvload-ingest` binary.

pub mod users;

pub use users::{IngestError, IngestOutcome, PgUserStore, RunStatus, UsersPipeline};
