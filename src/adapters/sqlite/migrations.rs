//! Schema versioning for the embedded SQL migrations.

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration {version} ({name}) failed: {source}")]
    Apply {
        version: i64,
        name: &'static str,
        #[source]
        source: sqlx::Error,
    },
    #[error("cannot read schema version: {0}")]
    Version(#[source] sqlx::Error),
}

/// One schema step compiled into the binary.
#[derive(Debug, Clone, Copy)]
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub sql: &'static str,
}

/// Ordered by version.
pub const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    name: "todos, tags and the document index",
    sql: include_str!("../../../migrations/001_initial_schema.sql"),
}];

/// Tracks applied versions in `schema_migrations`.
pub struct SchemaMigrator {
    pool: SqlitePool,
}

impl SchemaMigrator {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Highest applied version, 0 for a fresh database.
    pub async fn current_version(&self) -> Result<i64, MigrationError> {
        let (version,): (i64,) = sqlx::query_as("SELECT COALESCE(MAX(version), 0) FROM schema_migrations")
            .fetch_one(&self.pool)
            .await
            .map_err(MigrationError::Version)?;
        Ok(version)
    }

    /// Applies every migration above the current version and returns how many ran.
    pub async fn migrate(&self, migrations: &[Migration]) -> Result<usize, MigrationError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                name TEXT NOT NULL,
                applied_at TEXT NOT NULL DEFAULT (datetime('now'))
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(MigrationError::Version)?;

        let current = self.current_version().await?;
        let mut applied = 0;
        for migration in migrations.iter().filter(|m| m.version > current) {
            self.apply(migration).await?;
            info!(version = migration.version, name = migration.name, "applied migration");
            applied += 1;
        }
        if applied == 0 {
            debug!(version = current, "schema up to date");
        }
        Ok(applied)
    }

    async fn apply(&self, migration: &Migration) -> Result<(), MigrationError> {
        let fail = |source| MigrationError::Apply {
            version: migration.version,
            name: migration.name,
            source,
        };

        let mut tx = self.pool.begin().await.map_err(fail)?;
        sqlx::raw_sql(migration.sql).execute(&mut *tx).await.map_err(fail)?;
        sqlx::query("INSERT INTO schema_migrations (version, name) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.name)
            .execute(&mut *tx)
            .await
            .map_err(fail)?;
        tx.commit().await.map_err(fail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::create_test_pool;

    #[tokio::test]
    async fn test_migrate_twice_applies_once() {
        let pool = create_test_pool().await.unwrap();
        let migrator = SchemaMigrator::new(pool.clone());

        assert_eq!(migrator.migrate(MIGRATIONS).await.unwrap(), MIGRATIONS.len());
        assert_eq!(migrator.current_version().await.unwrap(), 1);
        assert_eq!(migrator.migrate(MIGRATIONS).await.unwrap(), 0);

        let tables: Vec<(String,)> =
            sqlx::query_as("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
                .fetch_all(&pool)
                .await
                .unwrap();
        let names: Vec<&str> = tables.iter().map(|(n,)| n.as_str()).collect();
        for expected in ["chunks", "documents", "tags", "todo_tags", "todos"] {
            assert!(names.contains(&expected), "missing table {expected}");
        }
    }

    #[test]
    fn test_versions_strictly_increase() {
        assert!(MIGRATIONS.windows(2).all(|w| w[0].version < w[1].version));
    }
}
