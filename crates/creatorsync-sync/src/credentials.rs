//! Proactive refresh of OAuth credentials nearing expiry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use creatorsync_core::{Platform, SocialAccount};
use creatorsync_vault::{decrypt_refresh_token, encrypt_credential, CredentialVault, CryptoError};

use crate::error::SyncError;
use crate::events::{EventBus, SyncEvent};
use crate::flight::InFlight;
use crate::oauth::{OAuthPlatforms, TokenGrant};
use crate::report::RefreshReport;
use crate::store::AccountStore;

pub struct CredentialLifecycleManager {
    accounts: Arc<dyn AccountStore>,
    vault: Arc<CredentialVault>,
    oauth: OAuthPlatforms,
    events: EventBus,
    in_flight: InFlight,
}

/// Why one account's refresh did not complete.
enum RefreshFailure {
    /// The stored grant is unusable; the account is deactivated.
    Revoked(SyncError),
    /// Our side failed; the account stays active and is retried next run.
    Transient(SyncError),
}

impl CredentialLifecycleManager {
    #[must_use]
    pub fn new(
        accounts: Arc<dyn AccountStore>,
        vault: Arc<CredentialVault>,
        oauth: OAuthPlatforms,
        events: EventBus,
    ) -> Self {
        Self {
            accounts,
            vault,
            oauth,
            events,
            in_flight: InFlight::default(),
        }
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.in_flight.is_running()
    }

    /// Refreshes every active OAuth credential expiring within
    /// `horizon_days`. Returns a skipped report if a refresh pass is
    /// already running.
    ///
    /// A failed decrypt, a missing refresh token or a rejected refresh
    /// deactivates the account on the first failure. Failures to persist a
    /// new token are reported and leave the account active.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] only if the candidate accounts
    /// cannot be loaded.
    pub async fn refresh_expiring(&self, horizon_days: i64) -> Result<RefreshReport, SyncError> {
        let Some(_guard) = self.in_flight.try_begin() else {
            tracing::info!("credential refresh already in flight, skipping");
            return Ok(RefreshReport::skipped());
        };

        let oauth_platforms: Vec<Platform> = Platform::ALL
            .into_iter()
            .filter(|p| p.requires_oauth())
            .collect();
        let expires_before = Utc::now() + Duration::days(horizon_days.max(0));
        let accounts = self
            .accounts
            .expiring_credentials(&oauth_platforms, expires_before)
            .await?;
        tracing::info!(candidates = accounts.len(), horizon_days, "credential refresh started");

        let mut report = RefreshReport::default();
        for account in accounts.iter().filter(|a| a.is_active) {
            match self.refresh_account(account).await {
                Ok(()) => report.succeeded += 1,
                Err(RefreshFailure::Transient(err)) => {
                    tracing::warn!(
                        account_id = account.id,
                        platform = %account.platform,
                        error = %err,
                        "credential refresh failed, account left active"
                    );
                    report.record_failure(account, &err);
                }
                Err(RefreshFailure::Revoked(err)) => {
                    if self.deactivate(account, &err).await {
                        report.deactivated += 1;
                    }
                    report.record_failure(account, &err);
                }
            }
        }

        tracing::info!(
            succeeded = report.succeeded,
            failed = report.failed,
            deactivated = report.deactivated,
            "credential refresh finished"
        );
        self.events.publish(SyncEvent::CredentialsRefreshed {
            succeeded: report.succeeded,
            failed: report.failed,
            deactivated: report.deactivated,
        });
        Ok(report)
    }

    async fn refresh_account(&self, account: &SocialAccount) -> Result<(), RefreshFailure> {
        let Some(client) = self.oauth.get(account.platform) else {
            return Err(RefreshFailure::Transient(SyncError::NotConfigured(format!(
                "{} OAuth client",
                account.platform
            ))));
        };
        let credential = account
            .credential
            .as_ref()
            .ok_or(RefreshFailure::Revoked(SyncError::MissingCredential("refresh")))?;

        let refresh_token = match decrypt_refresh_token(&self.vault, credential) {
            Ok(token) => token,
            Err(CryptoError::MissingToken(which)) => {
                return Err(RefreshFailure::Revoked(SyncError::MissingCredential(which)));
            }
            Err(e) => return Err(RefreshFailure::Revoked(e.into())),
        };

        let grant: TokenGrant = client
            .refresh(&refresh_token)
            .await
            .map_err(|e| RefreshFailure::Revoked(SyncError::CredentialRefresh(e)))?;

        let sealed = encrypt_credential(
            &self.vault,
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_at,
        )
        .map_err(|e| RefreshFailure::Transient(e.into()))?;

        self.accounts
            .update_credential(account.id, &sealed)
            .await
            .map_err(|e| RefreshFailure::Transient(e.into()))?;

        tracing::debug!(
            account_id = account.id,
            platform = %account.platform,
            rotated = grant.refresh_token.is_some(),
            expires_at = ?grant.expires_at,
            "credential refreshed"
        );
        Ok(())
    }

    /// Returns whether the account was actually deactivated.
    async fn deactivate(&self, account: &SocialAccount, err: &SyncError) -> bool {
        let reason = err.to_string();
        tracing::warn!(
            account_id = account.id,
            platform = %account.platform,
            reason = %reason,
            "deactivating account after credential failure"
        );
        if let Err(e) = self.accounts.deactivate(account.id, &reason).await {
            tracing::error!(account_id = account.id, error = %e, "failed to deactivate account");
            return false;
        }
        self.events.publish(SyncEvent::AccountDeactivated {
            account_id: account.id,
            owner_id: account.owner_id,
            platform: account.platform,
            reason,
        });
        true
    }
}

#[cfg(test)]
#[path = "credentials_test.rs"]
mod tests;
