// SQLite store for per-window access statistics. One row per (path, flush
// cycle). The pool is lazy so an unreachable store degrades flushes instead
// of failing startup; ping() is the explicit availability probe.

use crate::models::SnapshotRow;
use sqlx::Row;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::path::Path;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::instrument;

pub struct StatsRepo {
    pool: SqlitePool,
    schema_ready: AtomicBool,
}

impl StatsRepo {
    pub fn connect(path: &str, max_pool_size: u32) -> anyhow::Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            std::fs::create_dir_all(parent)?;
        }
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}", path))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(std::time::Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_pool_size)
            .connect_lazy_with(opts);
        Ok(Self {
            pool,
            schema_ready: AtomicBool::new(false),
        })
    }

    /// Availability probe used at startup. Failure is non-fatal to the
    /// caller: statistics keep accumulating and flushes keep retrying.
    pub async fn ping(&self) -> anyhow::Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    pub async fn init(&self) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS access_stats (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at INTEGER NOT NULL,
                app_id INTEGER NOT NULL,
                app_name TEXT NOT NULL,
                path TEXT NOT NULL,
                access_count INTEGER NOT NULL CHECK (access_count > 0),
                avg_latency_ms REAL NOT NULL,
                min_latency_ms REAL NOT NULL,
                max_latency_ms REAL NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_access_stats_created_at ON access_stats(created_at)",
        )
        .execute(&self.pool)
        .await?;

        self.schema_ready.store(true, Ordering::Release);
        Ok(())
    }

    /// Retries schema creation until one init has succeeded. When the store
    /// is down at startup, init never ran; the write path self-heals here
    /// once the store is back (CREATE TABLE IF NOT EXISTS makes the retry
    /// free).
    async fn ensure_schema(&self) -> anyhow::Result<()> {
        if self.schema_ready.load(Ordering::Acquire) {
            return Ok(());
        }
        self.init().await
    }

    /// Inserts one snapshot row stamped with the cycle timestamp (ms epoch).
    #[instrument(skip(self, row), fields(repo = "stats", operation = "insert_row", path = %row.path))]
    pub async fn insert_row(&self, created_at: i64, row: &SnapshotRow) -> anyhow::Result<()> {
        self.ensure_schema().await?;
        sqlx::query(
            "INSERT INTO access_stats
             (created_at, app_id, app_name, path, access_count, avg_latency_ms, min_latency_ms, max_latency_ms)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(created_at)
        .bind(row.app_id)
        .bind(&row.app_name)
        .bind(&row.path)
        .bind(row.count as i64)
        .bind(row.avg_latency_ms)
        .bind(row.min_latency_ms)
        .bind(row.max_latency_ms)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Most recent rows in insertion order (oldest of the window first).
    #[instrument(skip(self), fields(repo = "stats", operation = "get_recent_rows"))]
    pub async fn get_recent_rows(&self, limit: u32) -> anyhow::Result<Vec<SnapshotRow>> {
        let rows = sqlx::query(
            "SELECT app_id, app_name, path, access_count, avg_latency_ms, min_latency_ms, max_latency_ms
             FROM access_stats ORDER BY id DESC LIMIT $1",
        )
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_row(&row)?);
        }
        out.reverse();
        Ok(out)
    }

    /// All rows for one path, ascending by cycle timestamp.
    #[instrument(skip(self), fields(repo = "stats", operation = "get_rows_for_path"))]
    pub async fn get_rows_for_path(&self, path: &str) -> anyhow::Result<Vec<SnapshotRow>> {
        let rows = sqlx::query(
            "SELECT app_id, app_name, path, access_count, avg_latency_ms, min_latency_ms, max_latency_ms
             FROM access_stats WHERE path = $1 ORDER BY created_at ASC",
        )
        .bind(path)
        .fetch_all(&self.pool)
        .await?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(Self::parse_row(&row)?);
        }
        Ok(out)
    }

    fn parse_row(row: &sqlx::sqlite::SqliteRow) -> anyhow::Result<SnapshotRow> {
        let app_id: i64 = row.try_get("app_id")?;
        let app_name: String = row.try_get("app_name")?;
        let path: String = row.try_get("path")?;
        let access_count: i64 = row.try_get("access_count")?;
        let avg_latency_ms: f64 = row.try_get("avg_latency_ms")?;
        let min_latency_ms: f64 = row.try_get("min_latency_ms")?;
        let max_latency_ms: f64 = row.try_get("max_latency_ms")?;
        Ok(SnapshotRow {
            app_id,
            app_name,
            path,
            count: access_count as u64,
            avg_latency_ms,
            min_latency_ms,
            max_latency_ms,
        })
    }
}
