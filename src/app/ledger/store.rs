//! SQLite-backed job ledger (via sqlx)

use std::path::Path;
use std::sync::Arc;

use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use super::types::{DownloadJob, DownloadStats, JobId, JobStatus, PendingJob};
use crate::constants::ledger;
use crate::errors::{LedgerError, LedgerResult};

/// Handle to the durable job ledger
///
/// Cloning is cheap; all clones share one connection pool and one write
/// lock, so discovery and every worker can hold their own handle.
#[derive(Debug, Clone)]
pub struct Ledger {
    pool: SqlitePool,
    /// Serializes writers so SQLite never sees two competing write transactions
    write_lock: Arc<Mutex<()>>,
}

impl Ledger {
    /// Open (or create) the ledger at `path` and run migrations
    pub async fn open(path: &Path) -> LedgerResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| LedgerError::Location {
                    path: parent.to_path_buf(),
                    source,
                })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(ledger::BUSY_TIMEOUT);

        let pool = SqlitePoolOptions::new()
            .max_connections(ledger::MAX_CONNECTIONS)
            .connect_with(options)
            .await?;

        let ledger = Self::from_pool(pool).await?;
        info!("Opened download ledger at {}", path.display());
        Ok(ledger)
    }

    /// Open a private in-memory ledger (tests and dry runs)
    pub async fn open_in_memory() -> LedgerResult<Self> {
        // One connection that never idles out, otherwise the pool could hand
        // back a fresh empty database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect("sqlite::memory:")
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> LedgerResult<Self> {
        let ledger = Self {
            pool,
            write_lock: Arc::new(Mutex::new(())),
        };
        ledger.migrate().await?;
        Ok(ledger)
    }

    async fn migrate(&self) -> LedgerResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS downloads (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT NOT NULL,
                url TEXT NOT NULL UNIQUE,
                metadata TEXT,
                status TEXT NOT NULL DEFAULT 'pending',
                filename TEXT,
                filesize INTEGER,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_downloads_status ON downloads(status, id)")
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Register a new pending job
    ///
    /// Returns `false` when the URL is already known, whatever its status.
    /// The uniqueness check and the insert are one statement.
    pub async fn add_download_entry(
        &self,
        source: &str,
        url: &str,
        metadata: Option<&str>,
    ) -> LedgerResult<bool> {
        let now = Utc::now().to_rfc3339();
        let _guard = self.write_lock.lock().await;

        let inserted = sqlx::query(
            r#"
            INSERT INTO downloads (source, url, metadata, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, 'pending', ?4, ?4)
            ON CONFLICT(url) DO NOTHING
            "#,
        )
        .bind(source)
        .bind(url)
        .bind(metadata)
        .bind(&now)
        .execute(&self.pool)
        .await?
        .rows_affected()
            == 1;

        if inserted {
            debug!("Registered {} job: {}", source, url);
        } else {
            debug!("Already known, not added: {}", url);
        }
        Ok(inserted)
    }

    /// Pending jobs in insertion order, at most `limit`
    pub async fn get_pending_downloads(&self, limit: usize) -> LedgerResult<Vec<PendingJob>> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query(
            r#"
            SELECT id, url, source, metadata
            FROM downloads
            WHERE status = 'pending'
            ORDER BY id
            LIMIT ?1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let jobs = rows
            .into_iter()
            .map(|row| PendingJob {
                id: row.get("id"),
                url: row.get("url"),
                source: row.get("source"),
                metadata: row.get("metadata"),
            })
            .collect();
        Ok(jobs)
    }

    /// Record the terminal outcome of a job
    ///
    /// Only pending rows are updated. Returns `false` (and leaves the row
    /// alone) if the job is unknown or already terminal.
    pub async fn update_download_status(
        &self,
        id: JobId,
        status: JobStatus,
        filename: Option<&str>,
        filesize: Option<u64>,
    ) -> LedgerResult<bool> {
        if !status.is_terminal() {
            return Err(LedgerError::InvalidStatus {
                status: status.to_string(),
            });
        }

        let filesize = filesize.map(|size| i64::try_from(size).unwrap_or(i64::MAX));
        let now = Utc::now().to_rfc3339();
        let _guard = self.write_lock.lock().await;

        let updated = sqlx::query(
            r#"
            UPDATE downloads
            SET status = ?1,
                filename = ?2,
                filesize = ?3,
                updated_at = ?4
            WHERE id = ?5 AND status = 'pending'
            "#,
        )
        .bind(status.as_str())
        .bind(filename)
        .bind(filesize)
        .bind(&now)
        .bind(id)
        .execute(&self.pool)
        .await?
        .rows_affected()
            == 1;

        if !updated {
            warn!(
                "Job {} was not pending; refusing to record status '{}'",
                id, status
            );
        }
        Ok(updated)
    }

    /// Counts per status and bytes written by successful jobs
    pub async fn get_download_stats(&self) -> LedgerResult<DownloadStats> {
        let row = sqlx::query(
            r#"
            SELECT
                COUNT(*) AS total_files,
                COALESCE(SUM(CASE WHEN status = 'success' THEN 1 ELSE 0 END), 0) AS successful,
                COALESCE(SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END), 0) AS failed,
                COALESCE(SUM(CASE WHEN status = 'skipped' THEN 1 ELSE 0 END), 0) AS skipped,
                COALESCE(SUM(CASE WHEN status = 'pending' THEN 1 ELSE 0 END), 0) AS pending,
                COALESCE(SUM(CASE WHEN status = 'success' THEN COALESCE(filesize, 0) ELSE 0 END), 0) AS total_bytes
            FROM downloads
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        let count = |column: &str| -> u64 { row.get::<i64, _>(column).max(0) as u64 };
        Ok(DownloadStats {
            total_files: count("total_files"),
            successful: count("successful"),
            failed: count("failed"),
            skipped: count("skipped"),
            pending: count("pending"),
            total_bytes: count("total_bytes"),
        })
    }

    /// Look up a single job
    pub async fn get_download(&self, id: JobId) -> LedgerResult<Option<DownloadJob>> {
        let row = sqlx::query(
            r#"
            SELECT id, source, url, metadata, status, filename, filesize, created_at, updated_at
            FROM downloads
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| -> LedgerResult<DownloadJob> {
            let status: String = row.get("status");
            Ok(DownloadJob {
                id: row.get("id"),
                source: row.get("source"),
                url: row.get("url"),
                metadata: row.get("metadata"),
                status: status.parse()?,
                filename: row.get("filename"),
                filesize: row.get("filesize"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
            })
        })
        .transpose()
    }

    /// Close every pooled connection
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
