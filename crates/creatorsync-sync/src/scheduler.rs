//! Periodic refresh of every linked account's profile and posts.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use creatorsync_core::{AccountMetadata, AccountMetrics, AppConfig, ScrapeResult, SocialAccount};
use creatorsync_scraper::ProfileScraper;
use creatorsync_vault::{decrypt_access_token, CredentialVault};

use crate::error::SyncError;
use crate::events::{EventBus, SyncEvent};
use crate::flight::InFlight;
use crate::gate::IntervalGate;
use crate::oauth::OAuthPlatforms;
use crate::report::{SyncReport, SyncTrigger};
use crate::store::AccountStore;
use crate::upsert::{RecordUpserter, UpsertOutcome};

#[derive(Debug, Clone, Copy)]
pub struct SchedulerSettings {
    /// Accounts synced more recently than this are left alone.
    pub freshness: chrono::Duration,
    /// Minimum spacing between two accounts' upstream calls.
    pub inter_account_delay: Duration,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            freshness: chrono::Duration::days(7),
            inter_account_delay: Duration::from_secs(2),
        }
    }
}

impl SchedulerSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            freshness: chrono::Duration::days(config.cache_ttl_days),
            inter_account_delay: Duration::from_millis(config.sync_inter_account_delay_ms),
        }
    }
}

/// Everything the scheduler talks to.
#[derive(Clone)]
pub struct SyncDeps {
    pub accounts: Arc<dyn AccountStore>,
    pub upserter: RecordUpserter,
    /// `None` when no scrape provider is configured; scrape-only accounts
    /// then fail with [`SyncError::NotConfigured`].
    pub scraper: Option<Arc<ProfileScraper>>,
    pub oauth: OAuthPlatforms,
    pub vault: Arc<CredentialVault>,
    pub events: EventBus,
}

pub struct SyncScheduler {
    deps: SyncDeps,
    settings: SchedulerSettings,
    in_flight: InFlight,
    stop_requested: AtomicBool,
}

impl SyncScheduler {
    #[must_use]
    pub fn new(deps: SyncDeps, settings: SchedulerSettings) -> Self {
        Self {
            deps,
            settings,
            in_flight: InFlight::default(),
            stop_requested: AtomicBool::new(false),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight.is_running()
    }

    /// Asks the current run to stop before its next account. No effect when
    /// idle.
    pub fn request_stop(&self) {
        if self.in_flight.is_running() {
            tracing::info!("sync stop requested");
            self.stop_requested.store(true, Ordering::Release);
        }
    }

    /// Syncs every active account that is due, one at a time.
    ///
    /// Per-account failures are collected into the report and never end the
    /// batch. If a run is already in flight this returns a skipped report
    /// without touching anything.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] only if the due accounts cannot be
    /// loaded.
    pub async fn run_once(&self, trigger: SyncTrigger) -> Result<SyncReport, SyncError> {
        let Some(_guard) = self.in_flight.try_begin() else {
            tracing::info!(%trigger, "sync already in flight, skipping");
            return Ok(SyncReport::skipped());
        };
        self.stop_requested.store(false, Ordering::Release);

        let stale_before = Utc::now() - self.settings.freshness;
        let accounts = self.deps.accounts.due_for_sync(stale_before).await?;
        tracing::info!(%trigger, due = accounts.len(), "sync run started");

        let mut report = SyncReport::default();
        let mut gate = IntervalGate::new(self.settings.inter_account_delay);

        for account in accounts.iter().filter(|a| a.is_active) {
            if self.stop_requested.load(Ordering::Acquire) {
                report.stopped = true;
                tracing::info!(
                    remaining = accounts.len() - report.success - report.failed,
                    "sync run stopping early"
                );
                break;
            }
            gate.wait().await;

            match self.sync_account(account).await {
                Ok(outcome) => {
                    report.success += 1;
                    tracing::info!(
                        account_id = account.id,
                        platform = %account.platform,
                        handle = %account.external_handle,
                        created = outcome.created,
                        updated = outcome.updated,
                        "account synced"
                    );
                }
                Err(err) => {
                    tracing::warn!(
                        account_id = account.id,
                        platform = %account.platform,
                        handle = %account.external_handle,
                        kind = ?err.kind(),
                        error = %err,
                        "account sync failed"
                    );
                    report.record_failure(account, &err);
                }
            }
        }

        if let Some(scraper) = &self.deps.scraper {
            let purged = scraper.cache().purge_expired();
            if purged > 0 {
                tracing::debug!(purged, "expired scrape cache entries purged");
            }
        }

        tracing::info!(
            %trigger,
            success = report.success,
            failed = report.failed,
            stopped = report.stopped,
            "sync run finished"
        );
        self.deps.events.publish(SyncEvent::SyncCompleted {
            trigger,
            success: report.success,
            failed: report.failed,
            stopped: report.stopped,
        });
        Ok(report)
    }

    async fn sync_account(&self, account: &SocialAccount) -> Result<UpsertOutcome, SyncError> {
        let snapshot = if account.platform.requires_oauth() {
            self.fetch_authenticated(account).await?
        } else {
            self.scrape(account).await?
        };

        let outcome = self.deps.upserter.upsert(account.id, &snapshot.posts).await?;
        self.deps
            .accounts
            .record_sync(
                account.id,
                &AccountMetrics::from_scrape(&snapshot),
                &AccountMetadata::from_scrape(&snapshot),
                Utc::now(),
            )
            .await?;
        Ok(outcome)
    }

    async fn fetch_authenticated(&self, account: &SocialAccount) -> Result<ScrapeResult, SyncError> {
        let credential = account
            .credential
            .as_ref()
            .ok_or(SyncError::MissingCredential("access"))?;
        if let Some(expired_at) = credential.expires_at.filter(|_| credential.is_expired_at(Utc::now())) {
            return Err(SyncError::CredentialExpired { expired_at });
        }
        let client = self
            .deps
            .oauth
            .get(account.platform)
            .ok_or_else(|| SyncError::NotConfigured(format!("{} OAuth client", account.platform)))?;

        let access_token = decrypt_access_token(&self.deps.vault, credential)?;
        Ok(client.fetch_snapshot(&access_token).await?)
    }

    async fn scrape(&self, account: &SocialAccount) -> Result<ScrapeResult, SyncError> {
        let scraper = self
            .deps
            .scraper
            .as_ref()
            .ok_or_else(|| SyncError::NotConfigured("scrape provider".to_string()))?;
        Ok(scraper
            .scrape(account.platform, &account.external_handle)
            .await?)
    }
}

#[cfg(test)]
#[path = "scheduler_test.rs"]
mod tests;
