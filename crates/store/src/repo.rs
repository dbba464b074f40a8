//! Repository for FFS profiles, stored files and the event log.
//!
//! The three tables are written together more often than not: creating a
//! profile records the profile and two log lines, a successful upload records
//! the file and one log line. Those writes share a transaction so a reader
//! never sees a file without the log entry announcing it.

use crate::Database;
use crate::error::{ErrorKind, Result};
use crate::models::{Ffs, FfsRow, FileRow, LogEntry, LogRow, NewFfs, NewFile, StoredFile};
use exn::ResultExt;
use sqlx::{SqliteConnection, SqlitePool};
use time::UtcDateTime;

/// Repository for managing profiles, files and log entries in the store.
///
/// # Relationships
///
/// - At most one profile is the default (enforced by a partial unique index)
/// - Every file belongs to exactly one profile
/// - Deleting a profile cascades to delete all of its files
/// - Log entries reference nothing and are never updated or deleted
#[derive(Debug, Clone)]
pub struct Repository {
    pool: SqlitePool,
}
impl From<&Database> for Repository {
    fn from(db: &Database) -> Self {
        Self { pool: db.pool().clone() }
    }
}
impl Repository {
    async fn write_log(conn: &mut SqliteConnection, event: &str) -> Result<LogEntry> {
        let row: LogRow = sqlx::query_as(include_str!("../queries/insert_log.sql"))
            .bind(UtcDateTime::now().unix_timestamp())
            .bind(event)
            .fetch_one(conn)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.try_into()
    }

    // =========================================================================
    // Profiles
    // =========================================================================

    /// Get the default profile, if one has been created.
    pub async fn default_ffs(&self) -> Result<Option<Ffs>> {
        let row: Option<FfsRow> = sqlx::query_as(include_str!("../queries/get_default_ffs.sql"))
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    /// Get a profile by the identifier the backend issued for it.
    pub async fn ffs_by_ffs_id(&self, ffs_id: impl AsRef<str>) -> Result<Option<Ffs>> {
        let row: Option<FfsRow> = sqlx::query_as(include_str!("../queries/get_ffs_by_ffs_id.sql"))
            .bind(ffs_id.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    /// Get a profile by its local row identifier.
    pub async fn ffs_by_id(&self, id: i64) -> Result<Option<Ffs>> {
        let row: Option<FfsRow> = sqlx::query_as(include_str!("../queries/get_ffs_by_id.sql"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    /// List every profile, the default first, then in creation order.
    pub async fn list_ffs(&self) -> Result<Vec<Ffs>> {
        let rows: Vec<FfsRow> = sqlx::query_as(include_str!("../queries/list_ffs.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    /// Record a newly created profile together with the events describing it.
    ///
    /// When the new profile is the default, any previous default loses the
    /// flag in the same transaction.
    pub async fn insert_ffs(&self, ffs: &NewFfs, events: &[String]) -> Result<Ffs> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        if ffs.is_default {
            sqlx::query(include_str!("../queries/clear_default_ffs.sql"))
                .execute(&mut *tx)
                .await
                .or_raise(|| ErrorKind::Database)?;
        }
        let row: FfsRow = sqlx::query_as(include_str!("../queries/insert_ffs.sql"))
            .bind(&ffs.ffs_id)
            .bind(&ffs.token)
            .bind(ffs.created_at.unix_timestamp())
            .bind(ffs.is_default)
            .fetch_one(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        for event in events {
            Self::write_log(&mut *tx, event).await?;
        }
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        row.try_into()
    }

    /// Make the given profile the default.
    ///
    /// Returns `false` (and changes nothing) if no profile has that identifier.
    pub async fn set_default(&self, ffs_id: impl AsRef<str>) -> Result<bool> {
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let exists: Option<FfsRow> = sqlx::query_as(include_str!("../queries/get_ffs_by_ffs_id.sql"))
            .bind(ffs_id.as_ref())
            .fetch_optional(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        if exists.is_none() {
            return Ok(false);
        }
        sqlx::query(include_str!("../queries/clear_default_ffs.sql"))
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        sqlx::query(include_str!("../queries/mark_default_ffs.sql"))
            .bind(ffs_id.as_ref())
            .execute(&mut *tx)
            .await
            .or_raise(|| ErrorKind::Database)?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        Ok(true)
    }

    /// Forget a profile and every file uploaded through it.
    ///
    /// Returns `true` if a profile was deleted.
    pub async fn delete_ffs(&self, ffs_id: impl AsRef<str>) -> Result<bool> {
        let result = sqlx::query(include_str!("../queries/delete_ffs.sql"))
            .bind(ffs_id.as_ref())
            .execute(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        Ok(result.rows_affected() > 0)
    }

    // =========================================================================
    // Files
    // =========================================================================

    /// Record a successful upload and its log line in a single transaction.
    ///
    /// Returns [`ErrorKind::DuplicateCid`] if a file with the same CID has
    /// already been recorded; nothing is written in that case.
    pub async fn insert_file(&self, file: &NewFile, event: &str) -> Result<StoredFile> {
        let file_row = FileRow::try_from(file)?;
        let mut tx = self.pool.begin().await.or_raise(|| ErrorKind::Database)?;
        let inserted = sqlx::query_as::<_, FileRow>(include_str!("../queries/insert_file.sql"))
            .bind(&file_row.file_path)
            .bind(&file_row.file_name)
            .bind(file_row.uploaded_at)
            .bind(file_row.file_size)
            .bind(&file_row.cid)
            .bind(file_row.ffs)
            .fetch_one(&mut *tx)
            .await;
        let row = match inserted {
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                exn::bail!(ErrorKind::DuplicateCid(file_row.cid));
            },
            other => other.or_raise(|| ErrorKind::Database)?,
        };
        Self::write_log(&mut *tx, event).await?;
        tx.commit().await.or_raise(|| ErrorKind::Database)?;
        row.try_into()
    }

    /// Get a stored file by its CID.
    pub async fn file_by_cid(&self, cid: impl AsRef<str>) -> Result<Option<StoredFile>> {
        let row: Option<FileRow> = sqlx::query_as(include_str!("../queries/get_file_by_cid.sql"))
            .bind(cid.as_ref())
            .fetch_optional(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        row.map(|r| r.try_into()).transpose()
    }

    /// List every stored file in upload order.
    pub async fn list_files(&self) -> Result<Vec<StoredFile>> {
        let rows: Vec<FileRow> = sqlx::query_as(include_str!("../queries/list_files.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }

    // =========================================================================
    // Log
    // =========================================================================

    /// Append one event to the log.
    pub async fn append_log(&self, event: impl AsRef<str>) -> Result<LogEntry> {
        let mut conn = self.pool.acquire().await.or_raise(|| ErrorKind::Database)?;
        Self::write_log(&mut *conn, event.as_ref()).await
    }

    /// List every log entry, oldest first.
    pub async fn list_logs(&self) -> Result<Vec<LogEntry>> {
        let rows: Vec<LogRow> = sqlx::query_as(include_str!("../queries/list_logs.sql"))
            .fetch_all(&self.pool)
            .await
            .or_raise(|| ErrorKind::Database)?;
        rows.into_iter().map(|r| r.try_into()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    async fn repo() -> Repository {
        let db = Database::connect_in_memory().await.unwrap();
        Repository::from(&db)
    }

    fn new_ffs(ffs_id: &str, is_default: bool) -> NewFfs {
        NewFfs {
            ffs_id: ffs_id.to_string(),
            token: format!("token-{ffs_id}"),
            created_at: UtcDateTime::now(),
            is_default,
        }
    }

    fn new_file(ffs: i64, cid: &str) -> NewFile {
        NewFile {
            file_path: PathBuf::from("_uploads/tmp0001"),
            file_name: "photo.jpg".to_string(),
            uploaded_at: UtcDateTime::now(),
            size: 512,
            cid: cid.to_string(),
            ffs,
        }
    }

    #[tokio::test]
    async fn test_insert_ffs_writes_events_in_order() {
        let repo = repo().await;
        let events = vec!["first".to_string(), "second".to_string()];
        let ffs = repo.insert_ffs(&new_ffs("a", true), &events).await.unwrap();
        assert!(ffs.is_default);
        let logs = repo.list_logs().await.unwrap();
        let texts: Vec<_> = logs.iter().map(|l| l.event.as_str()).collect();
        assert_eq!(texts, vec!["first", "second"]);
        assert!(logs[0].id < logs[1].id);
    }

    #[tokio::test]
    async fn test_new_default_replaces_previous_default() {
        let repo = repo().await;
        repo.insert_ffs(&new_ffs("a", true), &[]).await.unwrap();
        repo.insert_ffs(&new_ffs("b", true), &[]).await.unwrap();
        let default = repo.default_ffs().await.unwrap().unwrap();
        assert_eq!(default.ffs_id, "b");
        let defaults = repo.list_ffs().await.unwrap().into_iter().filter(|f| f.is_default).count();
        assert_eq!(defaults, 1);
    }

    #[tokio::test]
    async fn test_second_default_is_rejected_by_index() {
        let repo = repo().await;
        repo.insert_ffs(&new_ffs("a", true), &[]).await.unwrap();
        let result = sqlx::query("INSERT INTO ffs (ffs_id, token, created_at, is_default) VALUES ('b', 't', 0, 1)")
            .execute(&repo.pool)
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_set_default() {
        let repo = repo().await;
        repo.insert_ffs(&new_ffs("a", true), &[]).await.unwrap();
        repo.insert_ffs(&new_ffs("b", false), &[]).await.unwrap();
        assert!(repo.set_default("b").await.unwrap());
        assert_eq!(repo.default_ffs().await.unwrap().unwrap().ffs_id, "b");
        assert!(!repo.set_default("missing").await.unwrap());
        assert_eq!(repo.default_ffs().await.unwrap().unwrap().ffs_id, "b");
    }

    #[tokio::test]
    async fn test_list_ffs_puts_default_first() {
        let repo = repo().await;
        repo.insert_ffs(&new_ffs("a", false), &[]).await.unwrap();
        repo.insert_ffs(&new_ffs("b", true), &[]).await.unwrap();
        let ids: Vec<_> = repo.list_ffs().await.unwrap().into_iter().map(|f| f.ffs_id).collect();
        assert_eq!(ids, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_duplicate_cid_writes_nothing() {
        let repo = repo().await;
        let ffs = repo.insert_ffs(&new_ffs("a", true), &[]).await.unwrap();
        repo.insert_file(&new_file(ffs.id, "QmSame"), "uploaded").await.unwrap();
        let err = repo.insert_file(&new_file(ffs.id, "QmSame"), "uploaded again").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::DuplicateCid(cid) if cid == "QmSame"));
        assert_eq!(repo.list_files().await.unwrap().len(), 1);
        let logs = repo.list_logs().await.unwrap();
        assert_eq!(logs.len(), 1);
        assert_eq!(logs[0].event, "uploaded");
    }

    #[tokio::test]
    async fn test_file_requires_existing_ffs() {
        let repo = repo().await;
        let err = repo.insert_file(&new_file(42, "QmOrphan"), "uploaded").await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Database));
        assert!(repo.list_logs().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_deleting_ffs_cascades_to_files() {
        let repo = repo().await;
        let a = repo.insert_ffs(&new_ffs("a", true), &[]).await.unwrap();
        let b = repo.insert_ffs(&new_ffs("b", false), &[]).await.unwrap();
        repo.insert_file(&new_file(a.id, "QmA"), "a").await.unwrap();
        repo.insert_file(&new_file(b.id, "QmB"), "b").await.unwrap();
        assert!(repo.delete_ffs("a").await.unwrap());
        assert!(repo.file_by_cid("QmA").await.unwrap().is_none());
        assert_eq!(repo.file_by_cid("QmB").await.unwrap().unwrap().ffs, b.id);
        assert!(!repo.delete_ffs("a").await.unwrap());
    }

    #[tokio::test]
    async fn test_file_lookup_by_cid() {
        let repo = repo().await;
        let ffs = repo.insert_ffs(&new_ffs("a", true), &[]).await.unwrap();
        let stored = repo.insert_file(&new_file(ffs.id, "QmFound"), "uploaded").await.unwrap();
        let found = repo.file_by_cid("QmFound").await.unwrap().unwrap();
        assert_eq!(found, stored);
        assert_eq!(found.size, 512);
        assert_eq!(repo.ffs_by_id(found.ffs).await.unwrap().unwrap().ffs_id, "a");
        assert!(repo.file_by_cid("QmMissing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_append_log_keeps_insertion_order() {
        let repo = repo().await;
        for event in ["one", "two", "three"] {
            repo.append_log(event).await.unwrap();
        }
        let texts: Vec<_> = repo.list_logs().await.unwrap().into_iter().map(|l| l.event).collect();
        assert_eq!(texts, vec!["one", "two", "three"]);
    }
}
