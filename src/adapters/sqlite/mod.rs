//! SQLite storage for todos and the embedded document index.

pub mod chunk_store;
pub mod connection;
pub mod migrations;
pub mod todo_repository;

pub use chunk_store::SqliteChunkStore;
pub use connection::{create_pool, create_test_pool, ConnectionError, DatabaseLocation, PoolConfig};
pub use migrations::{Migration, MigrationError, SchemaMigrator, MIGRATIONS};
pub use todo_repository::SqliteTodoRepository;

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};

pub(crate) fn parse_uuid(s: &str) -> DomainResult<Uuid> {
    Uuid::parse_str(s).map_err(|e| DomainError::SerializationError(format!("bad id '{s}': {e}")))
}

/// Timestamps are stored as RFC 3339 text.
pub(crate) fn parse_datetime(s: &str) -> DomainResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DomainError::SerializationError(format!("bad timestamp '{s}': {e}")))
}

#[derive(Debug, thiserror::Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// Open `database_url` and bring its schema up to date.
pub async fn initialize_database(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, DatabaseError> {
    let pool = create_pool(database_url, config).await?;
    SchemaMigrator::new(pool.clone()).migrate(MIGRATIONS).await?;
    Ok(pool)
}

/// In-memory database with the schema applied.
pub async fn create_migrated_test_pool() -> Result<SqlitePool, DatabaseError> {
    initialize_database("sqlite::memory:", None).await
}
