//! Opening the SQLite database that records profiles, files and events.

use exn::ResultExt;
use sqlx::SqliteConnection;
use sqlx::pool::PoolConnectionMetadata;
use sqlx::sqlite::{SqliteAutoVacuum, SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous};
use std::str::FromStr;
use std::time::Duration;
use tracing::instrument;

use crate::error::{ErrorKind, Result};

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");
// Page loads are a couple of short reads; uploads add two inserts.
const POOL_SIZE: u32 = 5;
// Concurrent uploads each write a file row and an event row, and WAL mode
// allows a single writer, so give them time to queue.
const BUSY_TIMEOUT: Duration = Duration::from_millis(1500);

/// A migrated connection pool. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Open the database described by a `sqlite://` URL, creating the file
    /// and any missing parent directories first.
    #[instrument(skip_all, fields(url = %url))]
    pub async fn connect(url: &str) -> Result<Self> {
        let options = SqliteConnectOptions::from_str(url).or_raise(|| ErrorKind::Database)?;
        let options = with_pragmas(options).create_if_missing(true);
        let parent = options.get_filename().parent().filter(|p| !p.as_os_str().is_empty());
        if let Some(parent) = parent {
            std::fs::create_dir_all(parent).or_raise(|| ErrorKind::Database)?;
        }
        Self::open(options, POOL_SIZE).await
    }

    /// A private in-memory database, for tests here and in dependent crates.
    pub async fn connect_in_memory() -> Result<Self> {
        // Every connection to ":memory:" is a separate database.
        Self::open(with_pragmas(SqliteConnectOptions::new()).filename(":memory:"), 1).await
    }

    async fn open(options: SqliteConnectOptions, pool_size: u32) -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            // Runs for every pooled connection, not just the first.
            .after_connect(|conn, meta| Box::pin(async move { per_connection(conn, meta).await }))
            .max_connections(pool_size)
            .connect_with(options)
            .await
            .or_raise(|| ErrorKind::Database)?;
        let db = Self { pool };
        db.migrate().await?;
        Ok(db)
    }

    #[instrument(skip(self), name = "migrating database")]
    async fn migrate(&self) -> Result<()> {
        MIGRATOR.run(&self.pool).await.or_raise(|| ErrorKind::Migration)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Wait for in-flight queries, then close every connection.
    pub async fn close(&self) {
        _ = sqlx::query("PRAGMA optimize").execute(&self.pool).await;
        self.pool.close().await;
    }
}

fn with_pragmas(options: SqliteConnectOptions) -> SqliteConnectOptions {
    options
        .journal_mode(SqliteJournalMode::Wal)
        // Files cascade away with their profile.
        .foreign_keys(true)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(BUSY_TIMEOUT)
        .auto_vacuum(SqliteAutoVacuum::None)
}

/// Settings `SqliteConnectOptions` has no builder method for.
async fn per_connection(conn: &mut SqliteConnection, _meta: PoolConnectionMetadata) -> sqlx::Result<()> {
    sqlx::query("PRAGMA wal_autocheckpoint = 1000; PRAGMA cache_size = -4096; PRAGMA temp_store = MEMORY;")
        .execute(conn)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::connect_in_memory().await.unwrap();
        let (tables,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('ffs', 'files', 'logs')")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(tables, 3);
        // Already applied, so this is a no-op.
        db.migrate().await.unwrap();
        db.close().await;
    }

    #[tokio::test]
    async fn test_every_connection_is_configured() {
        let db = Database::connect_in_memory().await.unwrap();
        let (foreign_keys,): (i64,) = sqlx::query_as("PRAGMA foreign_keys").fetch_one(db.pool()).await.unwrap();
        assert_eq!(foreign_keys, 1);
        let (checkpoint,): (i64,) = sqlx::query_as("PRAGMA wal_autocheckpoint").fetch_one(db.pool()).await.unwrap();
        assert_eq!(checkpoint, 1000);
        db.close().await;
    }

    #[tokio::test]
    async fn test_connect_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ffsgate.db");
        let db = Database::connect(&format!("sqlite://{}", path.display())).await.unwrap();
        assert!(path.exists());
        db.close().await;
    }
}
