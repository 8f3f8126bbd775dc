//! Common test utilities for csvload server integration tests
//!
//! **Requirements**:
//! - PostgreSQL must be running and accessible
//! - DATABASE_URL environment variable must be set
//! - Tests will be skipped if DATABASE_URL is not configured
//!
//! Every pool connection uses the `csvload_it` schema so the tests never touch
//! an existing `users` table.

#![allow(dead_code)]

use csvload_server::db;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, PgPool};
use std::io::Write;
use tempfile::NamedTempFile;

pub const TEST_SCHEMA: &str = "csvload_it";

/// Setup helper that creates a pool on a clean `users` table if PostgreSQL is available
pub async fn setup_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_URL").ok()?;

    let admin = match PgPool::connect(&url).await {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Failed to connect to database: {}", e);
            return None;
        },
    };
    let create_schema = format!("CREATE SCHEMA IF NOT EXISTS {}", TEST_SCHEMA);
    if let Err(e) = sqlx::query(&create_schema).execute(&admin).await {
        eprintln!("Failed to create test schema: {}", e);
        return None;
    }
    admin.close().await;

    let pool = PgPoolOptions::new()
        .max_connections(4)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET search_path TO csvload_it").await?;
                Ok(())
            })
        })
        .connect(&url)
        .await
        .ok()?;

    db::ensure_users_table(&pool).await.ok()?;
    sqlx::query("ALTER TABLE users DROP CONSTRAINT IF EXISTS users_age_sane")
        .execute(&pool)
        .await
        .ok()?;
    sqlx::query("TRUNCATE users RESTART IDENTITY")
        .execute(&pool)
        .await
        .ok()?;

    Some(pool)
}

/// Write `contents` to a temporary CSV file
pub fn csv_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

/// Header plus `rows` valid users with ages cycling through 15..75
pub fn users_csv(rows: usize) -> NamedTempFile {
    let mut contents = String::from("name.firstName,name.lastName,age,address.city\n");
    for i in 0..rows {
        contents.push_str(&format!("First{i},Last{i},{},City{i}\n", 15 + (i % 60)));
    }
    csv_file(&contents)
}

pub async fn user_count(pool: &PgPool) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await
        .unwrap()
}
