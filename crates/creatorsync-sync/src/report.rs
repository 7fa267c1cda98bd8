//! Run summaries returned by the scheduler and the credential manager.

use creatorsync_core::{Platform, SocialAccount};
use serde::{Deserialize, Serialize};

use crate::error::SyncError;

/// Stable, serializable classification of a per-account failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Crypto,
    UpstreamNotFound,
    UpstreamTimeout,
    Upstream,
    CredentialRefresh,
    CredentialExpired,
    MissingCredential,
    Persistence,
    Ineligible,
    AlreadyLinked,
    NotConfigured,
}

/// What started a run. Stored verbatim in `sync_runs.trigger_source`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    Scheduler,
    Manual,
    Cli,
}

impl SyncTrigger {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SyncTrigger::Scheduler => "scheduler",
            SyncTrigger::Manual => "manual",
            SyncTrigger::Cli => "cli",
        }
    }
}

impl std::fmt::Display for SyncTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFailure {
    pub account_id: i64,
    pub platform: Platform,
    pub handle: String,
    pub kind: FailureKind,
    pub message: String,
}

impl AccountFailure {
    #[must_use]
    pub fn new(account: &SocialAccount, err: &SyncError) -> Self {
        Self {
            account_id: account.id,
            platform: account.platform,
            handle: account.external_handle.clone(),
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome of one pass over the accounts due for sync.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncReport {
    pub success: usize,
    pub failed: usize,
    pub failures: Vec<AccountFailure>,
    /// Another run was already in flight; nothing was attempted.
    pub skipped: bool,
    /// A stop was requested and the remaining accounts were left for the
    /// next run.
    pub stopped: bool,
}

impl SyncReport {
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub(crate) fn record_failure(&mut self, account: &SocialAccount, err: &SyncError) {
        self.failed += 1;
        self.failures.push(AccountFailure::new(account, err));
    }
}

/// Outcome of one credential refresh pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefreshReport {
    pub succeeded: usize,
    pub failed: usize,
    /// Subset of `failed` whose account was deactivated.
    pub deactivated: usize,
    pub failures: Vec<AccountFailure>,
    pub skipped: bool,
}

impl RefreshReport {
    #[must_use]
    pub fn skipped() -> Self {
        Self {
            skipped: true,
            ..Self::default()
        }
    }

    pub(crate) fn record_failure(&mut self, account: &SocialAccount, err: &SyncError) {
        self.failed += 1;
        self.failures.push(AccountFailure::new(account, err));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_kind_serializes_snake_case() {
        let json = serde_json::to_string(&FailureKind::UpstreamNotFound).unwrap();
        assert_eq!(json, "\"upstream_not_found\"");
    }

    #[test]
    fn trigger_codes_match_sync_run_check_constraint() {
        assert_eq!(SyncTrigger::Scheduler.as_str(), "scheduler");
        assert_eq!(SyncTrigger::Manual.as_str(), "manual");
        assert_eq!(SyncTrigger::Cli.to_string(), "cli");
    }

    #[test]
    fn skipped_reports_are_empty() {
        let report = SyncReport::skipped();
        assert!(report.skipped);
        assert_eq!(report.success + report.failed, 0);
        assert!(RefreshReport::skipped().failures.is_empty());
    }
}
