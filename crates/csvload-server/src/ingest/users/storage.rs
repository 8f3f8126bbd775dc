//! Storage layer for users ingestion
//!
//! The pipeline talks to storage through [`UserStore`] and [`IngestTransaction`] so
//! the transaction handle is injected rather than taken from a global pool.
//! [`PgUserStore`] is the PostgreSQL implementation.

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::debug;

use super::models::UserRecord;
use super::{IngestError, Result};

const INSERT_USERS_PREFIX: &str = "INSERT INTO users (name, age, address, additional_info) ";

const COUNT_USERS_WITH_AGE: &str = "SELECT COUNT(*) FROM users WHERE age IS NOT NULL";

const AGE_DISTRIBUTION: &str = r#"
    SELECT age_group, COUNT(*) AS count
    FROM (
        SELECT CASE
            WHEN age < 20 THEN '< 20'
            WHEN age BETWEEN 20 AND 40 THEN '20 to 40'
            WHEN age > 40 AND age <= 60 THEN '40 to 60'
            ELSE '> 60'
        END AS age_group
        FROM users
        WHERE age IS NOT NULL
    ) banded
    GROUP BY age_group
"#;

/// Row count for one age band label as returned by the distribution query
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct AgeBandCount {
    pub age_group: String,
    pub count: i64,
}

/// Storage backend for the users table
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Open the transaction that spans one ingestion run
    async fn begin(&self) -> Result<Box<dyn IngestTransaction>>;

    /// Number of stored users with a non-null age
    async fn count_users_with_age(&self) -> Result<i64>;

    /// Users with a non-null age grouped by band label, in no particular order
    async fn age_band_counts(&self) -> Result<Vec<AgeBandCount>>;
}

/// An open run transaction; nothing written through it is visible until `commit`
#[async_trait]
pub trait IngestTransaction: Send {
    /// Insert one batch. Empty batches do nothing.
    async fn insert_batch(&mut self, records: &[UserRecord]) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Builds and runs the multi-row insert for one batch
#[derive(Debug, Clone, Copy, Default)]
pub struct BatchWriter;

impl BatchWriter {
    pub fn new() -> Self {
        Self
    }

    /// Insert `records` with a single statement on the borrowed connection.
    ///
    /// Binds four parameters per row in row order: name, age, address, additional_info.
    pub async fn write(&self, records: &[UserRecord], conn: &mut PgConnection) -> Result<u64> {
        if records.is_empty() {
            return Ok(0);
        }

        let mut query_builder = Self::insert_query(records);
        let result = query_builder
            .build()
            .execute(&mut *conn)
            .await
            .map_err(IngestError::StorageWrite)?;

        debug!(rows = result.rows_affected(), "Batch inserted");

        Ok(result.rows_affected())
    }

    fn insert_query(records: &[UserRecord]) -> QueryBuilder<'_, Postgres> {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(INSERT_USERS_PREFIX);

        query_builder.push_values(records, |mut b, record| {
            b.push_bind(&record.name)
                .push_bind(record.age)
                .push_bind(record.address_json())
                .push_bind(record.additional_info_json());
        });

        query_builder
    }
}

/// PostgreSQL-backed [`UserStore`]
#[derive(Debug, Clone)]
pub struct PgUserStore {
    db: PgPool,
    writer: BatchWriter,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self {
            db,
            writer: BatchWriter::new(),
        }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn begin(&self) -> Result<Box<dyn IngestTransaction>> {
        let tx = self
            .db
            .begin()
            .await
            .map_err(IngestError::StorageConnectivity)?;

        Ok(Box::new(PgIngestTransaction {
            tx,
            writer: self.writer,
        }))
    }

    async fn count_users_with_age(&self) -> Result<i64> {
        sqlx::query_scalar::<_, i64>(COUNT_USERS_WITH_AGE)
            .fetch_one(&self.db)
            .await
            .map_err(IngestError::Report)
    }

    async fn age_band_counts(&self) -> Result<Vec<AgeBandCount>> {
        sqlx::query_as::<_, AgeBandCount>(AGE_DISTRIBUTION)
            .fetch_all(&self.db)
            .await
            .map_err(IngestError::Report)
    }
}

/// Run transaction holding one pooled connection until commit or rollback
pub struct PgIngestTransaction {
    tx: Transaction<'static, Postgres>,
    writer: BatchWriter,
}

#[async_trait]
impl IngestTransaction for PgIngestTransaction {
    async fn insert_batch(&mut self, records: &[UserRecord]) -> Result<u64> {
        self.writer.write(records, &mut self.tx).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.map_err(IngestError::Transaction)
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.map_err(IngestError::Transaction)
    }
}
