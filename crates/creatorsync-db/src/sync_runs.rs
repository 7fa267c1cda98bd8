//! Database operations for the `sync_runs` audit table.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::DbError;

const RUN_COLUMNS: &str = "id, public_id, run_type, trigger_source, status, started_at, \
     completed_at, succeeded_count, failed_count, failures, error_message";

/// A row from the `sync_runs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SyncRunRow {
    pub id: i64,
    pub public_id: Uuid,
    /// `sync` or `credential_refresh`.
    pub run_type: String,
    /// `scheduler`, `manual`, or `cli`.
    pub trigger_source: String,
    /// `running`, `succeeded`, `skipped`, or `failed`.
    pub status: String,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub succeeded_count: i32,
    pub failed_count: i32,
    /// jsonb array of per-account failures.
    pub failures: serde_json::Value,
    pub error_message: Option<String>,
}

/// Opens a run in `running` status.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the insert fails (including an unknown
/// `run_type` or `trigger_source`).
pub async fn create_sync_run(
    pool: &PgPool,
    run_type: &str,
    trigger_source: &str,
) -> Result<SyncRunRow, DbError> {
    let sql = format!(
        "INSERT INTO sync_runs (public_id, run_type, trigger_source, status) \
         VALUES ($1, $2, $3, 'running') \
         RETURNING {RUN_COLUMNS}"
    );
    let row = sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(Uuid::new_v4())
        .bind(run_type)
        .bind(trigger_source)
        .fetch_one(pool)
        .await?;

    Ok(row)
}

/// Closes a running run with its outcome counts.
///
/// `skipped` records a run that found another one in flight.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn complete_sync_run(
    pool: &PgPool,
    id: i64,
    skipped: bool,
    succeeded_count: i32,
    failed_count: i32,
    failures: &serde_json::Value,
) -> Result<(), DbError> {
    let status = if skipped { "skipped" } else { "succeeded" };
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = $2, completed_at = NOW(), \
             succeeded_count = $3, failed_count = $4, failures = $5::jsonb \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(status)
    .bind(succeeded_count)
    .bind(failed_count)
    .bind(failures)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Marks a running run as `failed` when the batch itself could not run.
///
/// # Errors
///
/// Returns [`DbError::InvalidSyncRunTransition`] if the run is not
/// `running`, or [`DbError::Sqlx`] if the update fails.
pub async fn fail_sync_run(pool: &PgPool, id: i64, error_message: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE sync_runs \
         SET status = 'failed', completed_at = NOW(), error_message = $2 \
         WHERE id = $1 AND status = 'running'",
    )
    .bind(id)
    .bind(error_message)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::InvalidSyncRunTransition {
            id,
            expected_status: "running",
        });
    }
    Ok(())
}

/// Returns the most recent `limit` runs, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_recent_sync_runs(pool: &PgPool, limit: i64) -> Result<Vec<SyncRunRow>, DbError> {
    let sql = format!(
        "SELECT {RUN_COLUMNS} FROM sync_runs \
         ORDER BY started_at DESC, id DESC \
         LIMIT $1"
    );
    let rows = sqlx::query_as::<_, SyncRunRow>(&sql)
        .bind(limit)
        .fetch_all(pool)
        .await?;

    Ok(rows)
}
