use axum::{
    extract::{Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use creatorsync_sync::SyncReport;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::middleware::RequestId;

use super::{map_db_error, map_sync_error, normalize_limit, ApiError, ApiResponse, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct SyncRunsQuery {
    pub limit: Option<i64>,
}

#[derive(Debug, Serialize)]
pub(super) struct SyncRunItem {
    sync_run_id: Uuid,
    run_type: String,
    trigger_source: String,
    status: String,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    succeeded_count: i32,
    failed_count: i32,
    failures: serde_json::Value,
    error_message: Option<String>,
}

/// Runs a sync pass inline. An overlapping request gets a report with
/// `skipped: true` instead of a second run.
pub(super) async fn trigger_sync(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
) -> Result<Json<ApiResponse<SyncReport>>, ApiError> {
    let report = state
        .service
        .trigger_manual_sync()
        .await
        .map_err(|e| map_sync_error(req_id.0.clone(), &e))?;

    Ok(Json(ApiResponse::new(report, req_id.0)))
}

pub(super) async fn list_sync_runs(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    Query(query): Query<SyncRunsQuery>,
) -> Result<Json<ApiResponse<Vec<SyncRunItem>>>, ApiError> {
    let rows = creatorsync_db::list_recent_sync_runs(&state.pool, normalize_limit(query.limit))
        .await
        .map_err(|e| map_db_error(req_id.0.clone(), &e))?;

    let data = rows
        .into_iter()
        .map(|row| SyncRunItem {
            sync_run_id: row.public_id,
            run_type: row.run_type,
            trigger_source: row.trigger_source,
            status: row.status,
            started_at: row.started_at,
            completed_at: row.completed_at,
            succeeded_count: row.succeeded_count,
            failed_count: row.failed_count,
            failures: row.failures,
            error_message: row.error_message,
        })
        .collect();

    Ok(Json(ApiResponse::new(data, req_id.0)))
}
