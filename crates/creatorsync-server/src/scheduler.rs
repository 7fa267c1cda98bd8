//! Recurring background jobs.
//!
//! Two cron jobs share the long-lived components: the account sync pass and
//! the credential refresh pass. Both are single-flight inside their
//! component, so a tick that lands on a still-running pass records a
//! skipped run.

use std::sync::Arc;

use creatorsync_core::AppConfig;
use creatorsync_sync::{
    run_refresh_recorded, run_sync_recorded, Components, CredentialLifecycleManager,
    SyncScheduler, SyncTrigger,
};
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

/// Registers both jobs and starts the scheduler. The returned handle must be
/// kept alive; dropping it stops the jobs.
///
/// # Errors
///
/// Returns [`JobSchedulerError`] for an invalid cron expression or if the
/// scheduler cannot start.
pub async fn build_scheduler(
    pool: PgPool,
    components: &Components,
    config: Arc<AppConfig>,
) -> Result<JobScheduler, JobSchedulerError> {
    let scheduler = JobScheduler::new().await?;

    register_sync_job(
        &scheduler,
        &config.sync_cron,
        pool.clone(),
        Arc::clone(&components.scheduler),
    )
    .await?;
    register_refresh_job(
        &scheduler,
        &config.credential_refresh_cron,
        pool,
        Arc::clone(&components.credentials),
        config.credential_horizon_days,
    )
    .await?;

    scheduler.start().await?;
    Ok(scheduler)
}

async fn register_sync_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    sync: Arc<SyncScheduler>,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let sync = Arc::clone(&sync);

        Box::pin(async move {
            tracing::info!("scheduler: starting account sync run");
            match run_sync_recorded(&pool, &sync, SyncTrigger::Scheduler).await {
                Ok(report) => tracing::info!(
                    success = report.success,
                    failed = report.failed,
                    skipped = report.skipped,
                    "scheduler: account sync run complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: account sync run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: account sync job registered");
    Ok(())
}

async fn register_refresh_job(
    scheduler: &JobScheduler,
    cron: &str,
    pool: PgPool,
    credentials: Arc<CredentialLifecycleManager>,
    horizon_days: i64,
) -> Result<(), JobSchedulerError> {
    let pool = Arc::new(pool);

    let job = Job::new_async(cron, move |_uuid, _lock| {
        let pool = Arc::clone(&pool);
        let credentials = Arc::clone(&credentials);

        Box::pin(async move {
            tracing::info!(horizon_days, "scheduler: starting credential refresh run");
            match run_refresh_recorded(&pool, &credentials, SyncTrigger::Scheduler, horizon_days)
                .await
            {
                Ok(report) => tracing::info!(
                    succeeded = report.succeeded,
                    failed = report.failed,
                    deactivated = report.deactivated,
                    "scheduler: credential refresh run complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: credential refresh run failed"),
            }
        })
    })?;

    scheduler.add(job).await?;
    tracing::info!(cron, "scheduler: credential refresh job registered");
    Ok(())
}
