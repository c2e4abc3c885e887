//! Opening the SQLite pool that backs todos and the document index.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::domain::models::DatabaseConfig;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("invalid database URL '{0}'")]
    InvalidUrl(String),
    #[error("cannot create database directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cannot open database: {0}")]
    Open(#[source] sqlx::Error),
}

/// Where the database lives, parsed from a `sqlite:` URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatabaseLocation {
    Memory,
    File(PathBuf),
}

impl DatabaseLocation {
    pub fn parse(url: &str) -> Self {
        let rest = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        let rest = rest.split('?').next().unwrap_or_default();
        if rest.is_empty() || rest == ":memory:" {
            Self::Memory
        } else {
            Self::File(PathBuf::from(rest))
        }
    }

    /// Creates the parent directory of a file database.
    fn prepare(&self) -> Result<(), ConnectionError> {
        let Self::File(path) = self else {
            return Ok(());
        };
        match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                std::fs::create_dir_all(parent).map_err(|source| ConnectionError::Directory {
                    path: parent.to_path_buf(),
                    source,
                })
            }
            _ => Ok(()),
        }
    }
}

/// Pool sizing.
#[derive(Debug, Clone)]
pub struct PoolConfig {
    pub max_connections: u32,
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 5,
            acquire_timeout: Duration::from_secs(3),
        }
    }
}

impl From<&DatabaseConfig> for PoolConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_connections: config.max_connections.max(1),
            ..Self::default()
        }
    }
}

/// Open a pool for `database_url`, creating the file (and its directory) on first use.
///
/// File databases run in WAL mode so the CLI can read while an index job writes.
pub async fn create_pool(database_url: &str, config: Option<PoolConfig>) -> Result<SqlitePool, ConnectionError> {
    let config = config.unwrap_or_default();
    let location = DatabaseLocation::parse(database_url);
    location.prepare()?;

    let mut options = SqliteConnectOptions::from_str(database_url)
        .map_err(|_| ConnectionError::InvalidUrl(database_url.to_string()))?
        .foreign_keys(true);
    let mut pool_options = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout);

    match &location {
        DatabaseLocation::File(_) => {
            options = options
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(Duration::from_secs(30));
        }
        // Every connection to :memory: is a separate database, so keep exactly one alive.
        DatabaseLocation::Memory => {
            pool_options = pool_options
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
    }

    pool_options
        .connect_with(options)
        .await
        .map_err(ConnectionError::Open)
}

/// Fresh in-memory database, used by tests.
pub async fn create_test_pool() -> Result<SqlitePool, ConnectionError> {
    create_pool("sqlite::memory:", None).await
}
