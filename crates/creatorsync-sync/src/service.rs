//! Operations exposed to the rest of the application.

use std::sync::Arc;

use creatorsync_core::SocialAccount;
use sqlx::PgPool;
use uuid::Uuid;

use crate::audit::run_sync_recorded;
use crate::error::SyncError;
use crate::report::{SyncReport, SyncTrigger};
use crate::scheduler::SyncScheduler;
use crate::store::AccountStore;

#[derive(Clone)]
pub struct AccountService {
    accounts: Arc<dyn AccountStore>,
    scheduler: Arc<SyncScheduler>,
    run_log: Option<PgPool>,
}

impl AccountService {
    #[must_use]
    pub fn new(accounts: Arc<dyn AccountStore>, scheduler: Arc<SyncScheduler>) -> Self {
        Self {
            accounts,
            scheduler,
            run_log: None,
        }
    }

    /// Records manual syncs in `sync_runs`.
    #[must_use]
    pub fn with_run_log(mut self, pool: PgPool) -> Self {
        self.run_log = Some(pool);
        self
    }

    /// All linked accounts of `owner_id`, active or not. Credentials are
    /// never serialized.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] on a store failure.
    pub async fn get_connected_accounts(&self, owner_id: Uuid) -> Result<Vec<SocialAccount>, SyncError> {
        Ok(self.accounts.accounts_for_owner(owner_id).await?)
    }

    /// Runs a sync now. Returns a skipped report if one is already running.
    ///
    /// # Errors
    ///
    /// See [`SyncScheduler::run_once`].
    pub async fn trigger_manual_sync(&self) -> Result<SyncReport, SyncError> {
        match &self.run_log {
            Some(pool) => run_sync_recorded(pool, &self.scheduler, SyncTrigger::Manual).await,
            None => self.scheduler.run_once(SyncTrigger::Manual).await,
        }
    }

    /// Removes an account and, through the foreign key cascade, its posts.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] wrapping `DbError::NotFound` for an
    /// unknown id.
    pub async fn disconnect(&self, account_id: i64) -> Result<(), SyncError> {
        self.accounts.delete(account_id).await?;
        tracing::info!(account_id, "account disconnected");
        Ok(())
    }
}
