use chrono::{DateTime, Utc};
use creatorsync_core::Platform;
use creatorsync_db::DbError;
use creatorsync_scraper::ScraperError;
use creatorsync_vault::CryptoError;
use thiserror::Error;
use uuid::Uuid;

use crate::oauth::OAuthError;
use crate::report::FailureKind;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("credential envelope rejected: {0}")]
    Crypto(#[from] CryptoError),

    #[error("no upstream data for {platform} account \"{handle}\"")]
    UpstreamNotFound { platform: Platform, handle: String },

    #[error("upstream timed out: {0}")]
    UpstreamTimeout(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("credential refresh failed: {0}")]
    CredentialRefresh(#[source] OAuthError),

    #[error("access token expired at {expired_at}")]
    CredentialExpired { expired_at: DateTime<Utc> },

    #[error("account has no stored {0} token")]
    MissingCredential(&'static str),

    #[error(transparent)]
    Persistence(#[from] DbError),

    #[error("owner {owner_id} is not eligible for a creator account")]
    Ineligible { owner_id: Uuid },

    #[error("owner {owner_id} already has a linked {platform} account")]
    AlreadyLinked { owner_id: Uuid, platform: Platform },

    #[error("{0} is not configured")]
    NotConfigured(String),
}

impl SyncError {
    #[must_use]
    pub fn kind(&self) -> FailureKind {
        match self {
            SyncError::Crypto(_) => FailureKind::Crypto,
            SyncError::UpstreamNotFound { .. } => FailureKind::UpstreamNotFound,
            SyncError::UpstreamTimeout(_) => FailureKind::UpstreamTimeout,
            SyncError::Upstream(_) => FailureKind::Upstream,
            SyncError::CredentialRefresh(_) => FailureKind::CredentialRefresh,
            SyncError::CredentialExpired { .. } => FailureKind::CredentialExpired,
            SyncError::MissingCredential(_) => FailureKind::MissingCredential,
            SyncError::Persistence(_) => FailureKind::Persistence,
            SyncError::Ineligible { .. } => FailureKind::Ineligible,
            SyncError::AlreadyLinked { .. } => FailureKind::AlreadyLinked,
            SyncError::NotConfigured(_) => FailureKind::NotConfigured,
        }
    }
}

impl From<ScraperError> for SyncError {
    fn from(err: ScraperError) -> Self {
        match err {
            ScraperError::UpstreamNotFound { platform, handle } => {
                SyncError::UpstreamNotFound { platform, handle }
            }
            e @ ScraperError::UpstreamTimeout { .. } => SyncError::UpstreamTimeout(e.to_string()),
            e => SyncError::Upstream(e.to_string()),
        }
    }
}

/// Errors from an authenticated data fetch. Refresh failures are mapped to
/// [`SyncError::CredentialRefresh`] at the call site instead.
impl From<OAuthError> for SyncError {
    fn from(err: OAuthError) -> Self {
        match err {
            OAuthError::Http(ref e) if e.is_timeout() => SyncError::UpstreamTimeout(err.to_string()),
            e => SyncError::Upstream(e.to_string()),
        }
    }
}
