//! Sync and credential refresh passes run from the command line.
//!
//! Both passes are written to `sync_runs` with trigger `cli`, the same way
//! the server's cron jobs record theirs.

use clap::Subcommand;
use creatorsync_core::AppConfig;
use creatorsync_sync::{run_refresh_recorded, run_sync_recorded, Components, SyncTrigger};
use sqlx::PgPool;

#[derive(Debug, Subcommand)]
pub enum SyncCommands {
    /// Sync every active account that is due
    Run,
    /// Refresh OAuth credentials expiring within the horizon
    RefreshCredentials {
        /// Days ahead to look for expiring credentials (defaults to config)
        #[arg(long)]
        horizon_days: Option<i64>,
    },
    /// Show the most recent sync and refresh runs
    Runs {
        #[arg(long, default_value = "20")]
        limit: i64,
    },
}

pub(crate) async fn run(pool: &PgPool, config: &AppConfig, command: SyncCommands) -> anyhow::Result<()> {
    match command {
        SyncCommands::Run => {
            let components = Components::build(pool.clone(), config)?;
            let report = run_sync_recorded(pool, &components.scheduler, SyncTrigger::Cli).await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
            if report.failed > 0 {
                tracing::warn!(failed = report.failed, "some accounts failed to sync");
            }
        }
        SyncCommands::RefreshCredentials { horizon_days } => {
            let horizon_days = horizon_days.unwrap_or(config.credential_horizon_days);
            anyhow::ensure!(horizon_days >= 0, "--horizon-days must not be negative");

            let components = Components::build(pool.clone(), config)?;
            let report = run_refresh_recorded(
                pool,
                &components.credentials,
                SyncTrigger::Cli,
                horizon_days,
            )
            .await?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        SyncCommands::Runs { limit } => {
            let runs = creatorsync_db::list_recent_sync_runs(pool, limit.clamp(1, 200)).await?;
            if runs.is_empty() {
                println!("no sync runs recorded");
                return Ok(());
            }
            println!(
                "{:<20} {:<10} {:<10} {:<25} {:>9} {:>6}",
                "type", "trigger", "status", "started", "succeeded", "failed"
            );
            for run in runs {
                println!(
                    "{:<20} {:<10} {:<10} {:<25} {:>9} {:>6}",
                    run.run_type,
                    run.trigger_source,
                    run.status,
                    run.started_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    run.succeeded_count,
                    run.failed_count
                );
                if let Some(message) = run.error_message {
                    println!("    error: {message}");
                }
            }
        }
    }
    Ok(())
}
