//! SQLite storage layer -- schema, queries, migrations.

pub mod schema;

use crate::analysis::Analysis;
use crate::classify::ClassificationResult;
use crate::ingest::{InputFormat, LogRecord};
use chrono::{DateTime, SecondsFormat, Utc};
use r2d2::Pool as R2D2Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use thiserror::Error;
use uuid::Uuid;

/// Connection Pool type
pub type Pool = R2D2Pool<SqliteConnectionManager>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("failed to encode or decode stored analysis: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),

    #[error("database task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    #[error("stored analysis {id} is corrupt: {reason}")]
    Corrupt { id: String, reason: String },
}

/// Persistence for analyses. Point lookup by id plus a creation-time count.
#[async_trait::async_trait]
pub trait AnalysisStore: Send + Sync {
    async fn insert(&self, analysis: &Analysis) -> Result<(), StoreError>;

    /// `Ok(None)` when no analysis has this id.
    async fn get(&self, id: Uuid) -> Result<Option<Analysis>, StoreError>;

    /// Number of analyses created in `[start, end)`.
    async fn count_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError>;
}

/// Open (or create) the SQLite database and return a connection pool.
pub fn open_pool(path: &Path) -> Result<Pool, StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(path).with_init(|c| {
        c.execute_batch(
            "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA temp_store = MEMORY;
                 PRAGMA foreign_keys = ON;
                 PRAGMA busy_timeout = 5000;",
        )
    });

    let pool = R2D2Pool::new(manager)?;

    // Run migrations on a single connection
    let conn = pool.get()?;
    schema::migrate(&conn)?;

    Ok(pool)
}

/// Timestamps are stored as fixed-width RFC 3339 so text comparison orders them.
fn encode_time(t: &DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// [`AnalysisStore`] backed by a pooled SQLite database.
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool,
}

impl SqliteStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    pub fn open(path: &Path) -> Result<Self, StoreError> {
        tracing::info!(path = %path.display(), "Initializing database");
        Ok(Self::new(open_pool(path)?))
    }

    pub fn pool(&self) -> &Pool {
        &self.pool
    }

    /// Run `f` on a pooled connection off the async runtime.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T, StoreError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || {
            let conn = pool.get()?;
            f(&conn)
        })
        .await?
    }
}

type AnalysisRow = (String, String, String, i64, String, String);

fn decode_row(row: AnalysisRow) -> Result<Analysis, StoreError> {
    let (id, created_at, source_format, logs_count, result_json, logs_json) = row;
    let corrupt = |reason: String| StoreError::Corrupt {
        id: id.clone(),
        reason,
    };

    let analysis_id = Uuid::parse_str(&id).map_err(|e| corrupt(e.to_string()))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| corrupt(format!("bad created_at: {e}")))?
        .with_timezone(&Utc);
    let source_format: InputFormat = source_format.parse().map_err(corrupt)?;
    let logs_count = usize::try_from(logs_count).map_err(|e| corrupt(e.to_string()))?;
    let analysis_result: ClassificationResult = serde_json::from_str(&result_json)?;
    let logs: Vec<LogRecord> = serde_json::from_str(&logs_json)?;

    Ok(Analysis {
        analysis_id,
        created_at,
        source_format,
        logs_count,
        logs,
        analysis_result,
    })
}

#[async_trait::async_trait]
impl AnalysisStore for SqliteStore {
    async fn insert(&self, analysis: &Analysis) -> Result<(), StoreError> {
        let id = analysis.analysis_id.to_string();
        let created_at = encode_time(&analysis.created_at);
        let source_format = analysis.source_format.to_string();
        let logs_count = analysis.logs_count as i64;
        let overall = analysis.analysis_result.overall_risk_score.as_str();
        let summary = analysis.analysis_result.risk_summary.clone();
        let result_json = serde_json::to_string(&analysis.analysis_result)?;
        let logs_json = serde_json::to_string(&analysis.logs)?;

        self.with_conn(move |conn| {
            conn.execute(
                "INSERT INTO analyses (
                    analysis_id, created_at, source_format, logs_count,
                    overall_risk_score, risk_summary, result_json, logs_json
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                params![
                    id,
                    created_at,
                    source_format,
                    logs_count,
                    overall,
                    summary,
                    result_json,
                    logs_json,
                ],
            )?;
            tracing::debug!(analysis_id = %id, "stored analysis");
            Ok(())
        })
        .await
    }

    async fn get(&self, id: Uuid) -> Result<Option<Analysis>, StoreError> {
        self.with_conn(move |conn| {
            let row: Option<AnalysisRow> = conn
                .query_row(
                    "SELECT analysis_id, created_at, source_format, logs_count, result_json, logs_json
                     FROM analyses WHERE analysis_id = ?1",
                    params![id.to_string()],
                    |row| {
                        Ok((
                            row.get(0)?,
                            row.get(1)?,
                            row.get(2)?,
                            row.get(3)?,
                            row.get(4)?,
                            row.get(5)?,
                        ))
                    },
                )
                .optional()?;
            row.map(decode_row).transpose()
        })
        .await
    }

    async fn count_created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<u64, StoreError> {
        let (start, end) = (encode_time(&start), encode_time(&end));
        self.with_conn(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT COUNT(*) FROM analyses WHERE created_at >= ?1 AND created_at < ?2",
                params![start, end],
                |row| row.get(0),
            )?;
            Ok(count.max(0) as u64)
        })
        .await
    }
}
