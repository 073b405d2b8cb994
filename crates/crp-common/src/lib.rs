//! CRP Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared infrastructure for the Civic Request Platform workspace:
//!
//! - **Logging**: centralized `tracing` setup with console/file targets
//! - **Database**: Postgres connection pool configuration and construction

pub mod db;
pub mod logging;

// Re-export commonly used types
pub use db::{create_pool, DbConfig, DbError};
