// Users ingestion pipeline orchestration
//
// One run = one transaction:
// 1. BEGIN, then open the file
// 2. First non-empty line becomes the header
// 3. Every following non-empty line is parsed, mapped and buffered
// 4. Full buffers are flushed as one multi-row insert
// 5. COMMIT on clean EOF, ROLLBACK on any storage or I/O fault
// 6. The age report runs once, whatever the outcome

use chrono::{DateTime, Utc};
use std::path::Path;
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use super::batch::BatchAccumulator;
use super::mapper::map_record;
use super::models::{HeaderPath, UserRecord};
use super::parser::{build_record, decode_line, parse_header, parse_line};
use super::report::{AgeReport, ReportGenerator};
use super::storage::{IngestTransaction, UserStore};
use super::{IngestError, Result, DEFAULT_BATCH_SIZE};

/// Lifecycle of one ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Idle,
    HeaderPending,
    Streaming,
    Flushing,
    Committing,
    RollingBack,
    ReportPending,
    Done,
}

/// Final state of the run transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    Committed,
    RolledBack { reason: String },
}

impl RunStatus {
    pub fn is_committed(&self) -> bool {
        matches!(self, RunStatus::Committed)
    }
}

/// Counters collected while streaming
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestStats {
    /// Physical lines read, blank lines and the header included
    pub lines_read: usize,
    pub rows_accepted: usize,
    /// Rows skipped for a column-count mismatch or undecodable bytes
    pub rows_malformed: usize,
    pub rows_invalid: usize,
    pub batches_written: usize,
    /// Rows inserted inside the run transaction; only durable when committed
    pub rows_written: u64,
}

/// Result of a run that got as far as opening its transaction
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub run_id: Uuid,
    pub status: RunStatus,
    pub stats: IngestStats,
    pub report: Option<AgeReport>,
}

struct IngestionRun {
    id: Uuid,
    started_at: DateTime<Utc>,
    phase: RunPhase,
    header: Option<Vec<HeaderPath>>,
    accumulator: BatchAccumulator,
    stats: IngestStats,
}

impl IngestionRun {
    fn new(id: Uuid, batch_size: usize) -> Self {
        Self {
            id,
            started_at: Utc::now(),
            phase: RunPhase::Idle,
            header: None,
            accumulator: BatchAccumulator::new(batch_size),
            stats: IngestStats::default(),
        }
    }

    fn transition(&mut self, next: RunPhase) {
        debug!(run_id = %self.id, from = ?self.phase, to = ?next, "Run phase change");
        self.phase = next;
    }
}

/// Streams a CSV file into the users table and reports on the result
pub struct UsersPipeline {
    store: Arc<dyn UserStore>,
    report: ReportGenerator,
    batch_size: usize,
}

impl UsersPipeline {
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self {
            report: ReportGenerator::new(Arc::clone(&store)),
            store,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }

    /// Override the number of rows per insert (clamped to at least one)
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Ingest `path` under a fresh run id
    pub async fn run(&self, path: &Path) -> Result<IngestOutcome> {
        self.run_with_id(Uuid::new_v4(), path).await
    }

    /// Ingest `path` under the given run id.
    ///
    /// Only a failure to open the transaction is returned as `Err`. Every later
    /// failure rolls the run back and is reported through [`RunStatus`].
    pub async fn run_with_id(&self, run_id: Uuid, path: &Path) -> Result<IngestOutcome> {
        let span = info_span!("users_ingest", run_id = %run_id);
        self.execute(run_id, path).instrument(span).await
    }

    async fn execute(&self, run_id: Uuid, path: &Path) -> Result<IngestOutcome> {
        let mut run = IngestionRun::new(run_id, self.batch_size);
        info!(
            path = %path.display(),
            batch_size = self.batch_size,
            "Starting users ingestion"
        );

        let mut tx = self.store.begin().await.map_err(|e| {
            error!(error = %e, "Could not begin ingestion transaction");
            e
        })?;
        run.transition(RunPhase::HeaderPending);

        let status = match self.stream_file(&mut run, tx.as_mut(), path).await {
            Ok(()) => {
                run.transition(RunPhase::Committing);
                match tx.commit().await {
                    Ok(()) => {
                        info!(
                            rows = run.stats.rows_written,
                            batches = run.stats.batches_written,
                            "Ingestion committed"
                        );
                        RunStatus::Committed
                    },
                    Err(e) => {
                        error!(error = %e, "Commit failed, run discarded");
                        RunStatus::RolledBack {
                            reason: e.to_string(),
                        }
                    },
                }
            },
            Err(e) => {
                error!(error = %e, "Ingestion failed, rolling back");
                run.transition(RunPhase::RollingBack);
                if let Err(rollback_err) = tx.rollback().await {
                    error!(error = %rollback_err, "Rollback failed");
                }
                RunStatus::RolledBack {
                    reason: e.to_string(),
                }
            },
        };

        run.transition(RunPhase::ReportPending);
        let report = match self.report.generate().await {
            Ok(report) => report,
            Err(e) => {
                error!(error = %e, "Age report failed");
                None
            },
        };

        run.transition(RunPhase::Done);
        let elapsed = Utc::now() - run.started_at;
        info!(
            status = ?status,
            lines = run.stats.lines_read,
            accepted = run.stats.rows_accepted,
            malformed = run.stats.rows_malformed,
            invalid = run.stats.rows_invalid,
            elapsed_ms = elapsed.num_milliseconds(),
            "Users ingestion finished"
        );

        Ok(IngestOutcome {
            run_id: run.id,
            status,
            stats: run.stats,
            report,
        })
    }

    async fn stream_file(
        &self,
        run: &mut IngestionRun,
        tx: &mut dyn IngestTransaction,
        path: &Path,
    ) -> Result<()> {
        let file = File::open(path).await?;
        let mut reader = BufReader::new(file);
        let mut buf = Vec::new();
        let mut line_no = 0usize;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_no += 1;
            run.stats.lines_read += 1;

            let Some(line) = decode_line(&buf) else {
                if run.header.is_some() {
                    run.stats.rows_malformed += 1;
                }
                continue;
            };
            if line.is_empty() {
                continue;
            }

            let fields = parse_line(line);

            let Some(header) = &run.header else {
                debug!(columns = fields.len(), "Header read");
                run.header = Some(parse_header(&fields));
                run.transition(RunPhase::Streaming);
                continue;
            };

            match Self::map_row(header, &fields, line_no) {
                Ok(user) => {
                    run.stats.rows_accepted += 1;
                    run.accumulator.push(user);
                    if run.accumulator.is_full() {
                        Self::flush(run, tx).await?;
                    }
                },
                Err(e @ IngestError::MalformedRow { .. }) => {
                    warn!(line = line_no, error = %e, "Skipping malformed row");
                    run.stats.rows_malformed += 1;
                },
                Err(e) => {
                    warn!(line = line_no, error = %e, "Skipping invalid row");
                    run.stats.rows_invalid += 1;
                },
            }
        }

        if run.header.is_none() {
            warn!("Input has no header line, nothing to ingest");
        }

        if !run.accumulator.is_empty() {
            Self::flush(run, tx).await?;
        }

        Ok(())
    }

    fn map_row(headers: &[HeaderPath], fields: &[String], line: usize) -> Result<UserRecord> {
        if fields.len() != headers.len() {
            return Err(IngestError::MalformedRow {
                line,
                expected: headers.len(),
                actual: fields.len(),
            });
        }

        let record = build_record(headers, fields);
        Ok(map_record(&record)?)
    }

    async fn flush(run: &mut IngestionRun, tx: &mut dyn IngestTransaction) -> Result<()> {
        run.transition(RunPhase::Flushing);
        let batch = run.accumulator.drain();
        let written = tx.insert_batch(&batch).await?;

        run.stats.batches_written += 1;
        run.stats.rows_written += written;
        debug!(
            batch = run.stats.batches_written,
            rows = written,
            "Batch flushed"
        );

        run.transition(RunPhase::Streaming);
        Ok(())
    }
}
