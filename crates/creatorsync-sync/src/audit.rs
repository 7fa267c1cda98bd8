//! `sync_runs` bookkeeping around scheduler and credential passes.

use creatorsync_db::DbError;
use serde_json::Value;
use sqlx::PgPool;

use crate::credentials::CredentialLifecycleManager;
use crate::error::SyncError;
use crate::report::{AccountFailure, RefreshReport, SyncReport, SyncTrigger};
use crate::scheduler::SyncScheduler;

const RUN_TYPE_SYNC: &str = "sync";
const RUN_TYPE_CREDENTIAL_REFRESH: &str = "credential_refresh";

/// Runs one sync pass and records it in `sync_runs`.
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] if the run row cannot be opened, or
/// the error of [`SyncScheduler::run_once`].
pub async fn run_sync_recorded(
    pool: &PgPool,
    scheduler: &SyncScheduler,
    trigger: SyncTrigger,
) -> Result<SyncReport, SyncError> {
    let run = creatorsync_db::create_sync_run(pool, RUN_TYPE_SYNC, trigger.as_str()).await?;
    match scheduler.run_once(trigger).await {
        Ok(report) => {
            complete_best_effort(
                pool,
                run.id,
                report.skipped,
                report.success,
                &report.failures,
            )
            .await;
            Ok(report)
        }
        Err(e) => {
            fail_run_best_effort(pool, run.id, RUN_TYPE_SYNC, &e.to_string()).await;
            Err(e)
        }
    }
}

/// Runs one credential refresh pass and records it in `sync_runs`.
///
/// # Errors
///
/// Returns [`SyncError::Persistence`] if the run row cannot be opened, or
/// the error of [`CredentialLifecycleManager::refresh_expiring`].
pub async fn run_refresh_recorded(
    pool: &PgPool,
    manager: &CredentialLifecycleManager,
    trigger: SyncTrigger,
    horizon_days: i64,
) -> Result<RefreshReport, SyncError> {
    let run =
        creatorsync_db::create_sync_run(pool, RUN_TYPE_CREDENTIAL_REFRESH, trigger.as_str()).await?;
    match manager.refresh_expiring(horizon_days).await {
        Ok(report) => {
            complete_best_effort(
                pool,
                run.id,
                report.skipped,
                report.succeeded,
                &report.failures,
            )
            .await;
            Ok(report)
        }
        Err(e) => {
            fail_run_best_effort(pool, run.id, RUN_TYPE_CREDENTIAL_REFRESH, &e.to_string()).await;
            Err(e)
        }
    }
}

fn count(n: usize) -> i32 {
    i32::try_from(n).unwrap_or(i32::MAX)
}

async fn complete_best_effort(
    pool: &PgPool,
    run_id: i64,
    skipped: bool,
    succeeded: usize,
    failures: &[AccountFailure],
) {
    let failures_json = serde_json::to_value(failures).unwrap_or_else(|_| Value::Array(Vec::new()));
    if let Err(e) = creatorsync_db::complete_sync_run(
        pool,
        run_id,
        skipped,
        count(succeeded),
        count(failures.len()),
        &failures_json,
    )
    .await
    {
        log_audit_failure(run_id, &e);
    }
}

/// Marks a run failed, logging instead of propagating a second error.
pub async fn fail_run_best_effort(pool: &PgPool, run_id: i64, run_type: &str, message: &str) {
    tracing::error!(run_id, run_type, error = message, "run failed");
    if let Err(e) = creatorsync_db::fail_sync_run(pool, run_id, message).await {
        log_audit_failure(run_id, &e);
    }
}

fn log_audit_failure(run_id: i64, error: &DbError) {
    tracing::error!(run_id, error = %error, "failed to record sync run outcome");
}
