// CSV Users Ingestion Module
//
// Streams a comma-delimited file into the `users` table:
// - Parse: line splitting and dot-path header reconstruction (parser.rs)
// - Map: validation into fixed-shape user rows (mapper.rs)
// - Batch: bounded in-memory accumulation (batch.rs)
// - Store: multi-row inserts inside one transaction per run (storage.rs)
// - Pipeline: run state machine, commit/rollback, report trigger (pipeline.rs)
// - Report: age distribution summary over the stored rows (report.rs)
//
// Row-level problems (wrong column count, failed validation) skip the row.
// Storage and I/O failures roll back the whole run.

pub mod batch;
pub mod mapper;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod report;
pub mod storage;

pub use batch::BatchAccumulator;
pub use mapper::{map_record, ValidationError};
pub use models::{HeaderPath, NestedRecord, NestedValue, UserRecord};
pub use parser::{build_record, decode_line, parse_header, parse_line};
pub use pipeline::{IngestOutcome, IngestStats, RunPhase, RunStatus, UsersPipeline};
pub use report::{AgeBand, AgeReport, BandShare, ReportGenerator};
pub use storage::{AgeBandCount, BatchWriter, IngestTransaction, PgUserStore, UserStore};

/// Rows buffered before a multi-row insert is issued
pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Postgres accepts at most 65535 bind parameters per statement, four per row
pub const MAX_BATCH_SIZE: usize = 16383;

/// Result type for users ingestion
pub type Result<T> = std::result::Result<T, IngestError>;

/// Error types for users ingestion
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("Malformed row at line {line}: expected {expected} columns, found {actual}")]
    MalformedRow {
        line: usize,
        expected: usize,
        actual: usize,
    },

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Batch insert failed: {0}")]
    StorageWrite(#[source] sqlx::Error),

    #[error("Could not open a storage transaction: {0}")]
    StorageConnectivity(#[source] sqlx::Error),

    #[error("Transaction finalization failed: {0}")]
    Transaction(#[source] sqlx::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Report query failed: {0}")]
    Report(#[source] sqlx::Error),
}

impl IngestError {
    /// Row-level errors skip the offending line; everything else ends the run
    pub fn is_recoverable(&self) -> bool {
        matches!(self, IngestError::MalformedRow { .. } | IngestError::Validation(_))
    }
}
