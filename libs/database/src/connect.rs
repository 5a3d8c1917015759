use sea_orm::{Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;
use tracing::info;

use crate::config::PostgresConfig;
use crate::error::{DatabaseError, DatabaseResult};
use crate::retry::{retry_with_backoff, RetryConfig};

/// Connect with default pool settings.
pub async fn connect(database_url: &str) -> DatabaseResult<DatabaseConnection> {
    connect_from_config(&PostgresConfig::new(database_url)).await
}

/// Connect using an explicit [`PostgresConfig`].
pub async fn connect_from_config(config: &PostgresConfig) -> DatabaseResult<DatabaseConnection> {
    let db = Database::connect(config.clone().into_connect_options()).await?;
    info!("connected to PostgreSQL");
    Ok(db)
}

/// Connect with exponential-backoff retry.
///
/// Useful when the store may still be starting (compose files, CI services).
pub async fn connect_with_retry(
    config: &PostgresConfig,
    retry: Option<RetryConfig>,
) -> DatabaseResult<DatabaseConnection> {
    retry_with_backoff(|| connect_from_config(config), retry.unwrap_or_default()).await
}

/// Apply all pending migrations of the given migrator.
pub async fn run_migrations<M: MigratorTrait>(db: &DatabaseConnection) -> DatabaseResult<()> {
    M::up(db, None)
        .await
        .map_err(|e| DatabaseError::Migration(e.to_string()))?;
    info!("migrations applied");
    Ok(())
}
