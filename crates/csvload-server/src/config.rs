//! Configuration management

use std::path::PathBuf;

use crate::db::DbConfig;
use crate::ingest::users::{DEFAULT_BATCH_SIZE, MAX_BATCH_SIZE};

// ============================================================================
// Server Configuration Constants
// ============================================================================

/// Default server host binding.
pub const DEFAULT_SERVER_HOST: &str = "127.0.0.1";

/// Default server port.
pub const DEFAULT_SERVER_PORT: u16 = 3000;

/// Default shutdown timeout in seconds.
pub const DEFAULT_SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DbConfig,
    pub ingest: IngestSettings,
}

/// Server-specific configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub shutdown_timeout_secs: u64,
}

/// Settings for runs triggered over HTTP
#[derive(Debug, Clone)]
pub struct IngestSettings {
    /// File ingested by `POST /upload`; uploads fail while unset
    pub csv_file_path: Option<PathBuf>,
    pub batch_size: usize,
}

impl IngestSettings {
    pub fn from_env() -> Self {
        Self {
            csv_file_path: std::env::var("CSV_FILE_PATH")
                .ok()
                .filter(|s| !s.trim().is_empty())
                .map(PathBuf::from),
            batch_size: std::env::var("INGEST_BATCH_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_BATCH_SIZE),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        validate_batch_size(self.batch_size)
    }
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            csv_file_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
        }
    }
}

/// Reject batch sizes that would exceed the bind parameter limit of one insert
pub fn validate_batch_size(batch_size: usize) -> anyhow::Result<()> {
    if batch_size == 0 || batch_size > MAX_BATCH_SIZE {
        anyhow::bail!(
            "Ingest batch size must be between 1 and {}, got {}",
            MAX_BATCH_SIZE,
            batch_size
        );
    }
    Ok(())
}

impl Config {
    /// Load configuration from environment and defaults
    pub fn load() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let config = Config {
            server: ServerConfig {
                host: std::env::var("CSVLOAD_HOST")
                    .unwrap_or_else(|_| DEFAULT_SERVER_HOST.to_string()),
                port: std::env::var("PORT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SERVER_PORT),
                shutdown_timeout_secs: std::env::var("CSVLOAD_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(DEFAULT_SHUTDOWN_TIMEOUT_SECS),
            },
            database: DbConfig::from_env()?,
            ingest: IngestSettings::from_env(),
        };

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> anyhow::Result<()> {
        // Validate port
        if self.server.port == 0 {
            anyhow::bail!("Server port must be greater than 0");
        }

        // Validate database URL
        if self.database.url.is_empty() {
            anyhow::bail!("Database URL cannot be empty");
        }

        // Validate connection pool settings
        if self.database.max_connections == 0 {
            anyhow::bail!("Database max_connections must be greater than 0");
        }

        if self.database.min_connections > self.database.max_connections {
            anyhow::bail!(
                "Database min_connections ({}) cannot be greater than max_connections ({})",
                self.database.min_connections,
                self.database.max_connections
            );
        }

        self.ingest.validate()?;

        if self.ingest.csv_file_path.is_none() {
            tracing::warn!("CSV_FILE_PATH is not set - uploads will be refused");
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: DEFAULT_SERVER_HOST.to_string(),
                port: DEFAULT_SERVER_PORT,
                shutdown_timeout_secs: DEFAULT_SHUTDOWN_TIMEOUT_SECS,
            },
            database: DbConfig::default(),
            ingest: IngestSettings::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    const VARS: [&str; 5] = [
        "CSVLOAD_HOST",
        "PORT",
        "CSV_FILE_PATH",
        "INGEST_BATCH_SIZE",
        "DATABASE_URL",
    ];

    fn clear_env() {
        for name in VARS {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.ingest.batch_size, 1000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_port_is_rejected() {
        let mut config = Config::default();
        config.server.port = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_min_connections_above_max_is_rejected() {
        let mut config = Config::default();
        config.database.min_connections = 20;
        config.database.max_connections = 5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_batch_size_bounds() {
        assert!(validate_batch_size(0).is_err());
        assert!(validate_batch_size(1).is_ok());
        assert!(validate_batch_size(MAX_BATCH_SIZE).is_ok());
        assert!(validate_batch_size(MAX_BATCH_SIZE + 1).is_err());
    }

    #[test]
    #[serial]
    fn test_load_reads_environment() {
        clear_env();
        std::env::set_var("DATABASE_URL", "postgresql://localhost/csvload_test");
        std::env::set_var("PORT", "8088");
        std::env::set_var("CSV_FILE_PATH", "/data/users.csv");
        std::env::set_var("INGEST_BATCH_SIZE", "250");

        let config = Config::load().unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, DEFAULT_SERVER_HOST);
        assert_eq!(config.ingest.csv_file_path, Some(PathBuf::from("/data/users.csv")));
        assert_eq!(config.ingest.batch_size, 250);
        assert_eq!(config.database.url, "postgresql://localhost/csvload_test");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_blank_csv_path_counts_as_unset() {
        clear_env();
        std::env::set_var("CSV_FILE_PATH", "   ");
        assert_eq!(IngestSettings::from_env().csv_file_path, None);
        clear_env();
    }

    #[test]
    #[serial]
    fn test_load_rejects_oversized_batch() {
        clear_env();
        std::env::set_var("DATABASE_URL", "postgresql://localhost/csvload_test");
        std::env::set_var("INGEST_BATCH_SIZE", "20000");

        assert!(Config::load().is_err());

        clear_env();
    }
}
