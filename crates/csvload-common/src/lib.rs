//! csvload Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared logging setup and error types for the csvload workspace.
//!
//! # Overview
//!
//! - **Logging**: `tracing` subscriber configuration (console, rolling files, JSON)
//! - **Error Handling**: error and result types shared by the binaries
//!
//! # Example
//!
//! ```no_run
//! use csvload_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod logging;

// Re-export commonly used types
pub use error::{CommonError, Result};
