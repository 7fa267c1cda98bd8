//! OAuth-authenticated platform clients.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use creatorsync_core::{Platform, ScrapeResult};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The token endpoint refused the grant (revoked, expired or malformed
    /// refresh token).
    #[error("token endpoint rejected the grant ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("unexpected response from {context}: {source}")]
    Deserialize {
        context: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("authenticated user has no channel")]
    NoChannel,
}

/// A freshly issued access token.
#[derive(Clone, PartialEq, Eq)]
pub struct TokenGrant {
    pub access_token: String,
    /// Present only when the provider rotated the refresh token.
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl std::fmt::Debug for TokenGrant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenGrant")
            .field("access_token", &"[redacted]")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "[redacted]"),
            )
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl TokenGrant {
    /// Builds a grant from an `expires_in` lifetime in seconds, as token
    /// endpoints report it.
    #[must_use]
    pub fn expiring_in(
        access_token: String,
        refresh_token: Option<String>,
        expires_in_secs: Option<i64>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token.filter(|t| !t.is_empty()),
            expires_at: expires_in_secs.map(|secs| now + Duration::seconds(secs)),
        }
    }
}

#[async_trait]
pub trait OAuthPlatform: Send + Sync {
    fn platform(&self) -> Platform;

    /// Exchanges a refresh token for a new access token.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError>;

    /// Reads the authenticated account's profile and recent content.
    async fn fetch_snapshot(&self, access_token: &str) -> Result<ScrapeResult, OAuthError>;
}

/// OAuth clients keyed by the platform they serve.
#[derive(Clone, Default)]
pub struct OAuthPlatforms {
    clients: HashMap<Platform, Arc<dyn OAuthPlatform>>,
}

impl std::fmt::Debug for OAuthPlatforms {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_set().entries(self.clients.keys()).finish()
    }
}

impl OAuthPlatforms {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, client: Arc<dyn OAuthPlatform>) -> Self {
        self.clients.insert(client.platform(), client);
        self
    }

    #[must_use]
    pub fn get(&self, platform: Platform) -> Option<&Arc<dyn OAuthPlatform>> {
        self.clients.get(&platform)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
