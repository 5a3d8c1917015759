//! PostgreSQL connection management for the catalog workspace.
//!
//! Everything here is plumbing around SeaORM: pool configuration (optionally
//! loaded from the environment), connect helpers with retry/backoff for
//! flaky startup ordering, migration running, and a health probe.
//!
//! # Example
//!
//! ```ignore
//! use database::{PostgresConfig, connect_from_config, run_migrations};
//! use migration::Migrator;
//!
//! let config = PostgresConfig::from_env()?;
//! let db = connect_from_config(&config).await?;
//! run_migrations::<Migrator>(&db).await?;
//! ```

mod config;
mod connect;
mod error;
mod health;
mod retry;

pub use config::PostgresConfig;
pub use connect::{connect, connect_from_config, connect_with_retry, run_migrations};
pub use error::{DatabaseError, DatabaseResult};
pub use health::check_health;
pub use retry::{retry_with_backoff, RetryConfig};

// Re-export the SeaORM types callers need to hold a connection.
pub use sea_orm::{ConnectOptions, DatabaseConnection, DbErr};
