//! Social account records owned by the sync subsystem.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::content::{round2, ScrapeResult};
use crate::platform::Platform;

/// Number of recent posts summarised into account metadata.
const RECENT_POST_SUMMARIES: usize = 12;

/// Maximum caption excerpt length (in characters) kept in summaries.
const CAPTION_EXCERPT_CHARS: usize = 140;

/// Encrypted OAuth credential. Token fields hold vault envelopes, never
/// plaintext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedCredential {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl EncryptedCredential {
    /// `None` when every field is absent, so scrape-only accounts carry no
    /// credential at all.
    #[must_use]
    pub fn from_parts(
        access_token: Option<String>,
        refresh_token: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Option<Self> {
        if access_token.is_none() && refresh_token.is_none() && expires_at.is_none() {
            return None;
        }
        Some(Self {
            access_token,
            refresh_token,
            expires_at,
        })
    }

    /// Whether the access token has expired at `now`. A missing expiry is
    /// treated as non-expiring.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// Audience metrics refreshed on every successful sync.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountMetrics {
    pub follower_count: i64,
    pub following_count: Option<i64>,
    pub content_count: Option<i64>,
    /// Percentage, two-decimal precision.
    pub engagement_rate: f64,
}

impl AccountMetrics {
    #[must_use]
    pub fn from_scrape(result: &ScrapeResult) -> Self {
        Self {
            follower_count: result.profile.follower_count,
            following_count: result.profile.following_count,
            content_count: result
                .profile
                .content_count
                .or_else(|| i64::try_from(result.posts.len()).ok()),
            engagement_rate: round2(result.engagement_rate),
        }
    }
}

/// Short summary of a recent post kept in account metadata for listing UIs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentPostSummary {
    pub external_post_id: String,
    pub caption_excerpt: Option<String>,
    pub post_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub views: Option<i64>,
}

/// Free-form normalized extras stored as jsonb.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccountMetadata {
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub top_hashtags: Vec<String>,
    #[serde(default)]
    pub recent_posts: Vec<RecentPostSummary>,
}

impl AccountMetadata {
    #[must_use]
    pub fn from_scrape(result: &ScrapeResult) -> Self {
        let mut recent: Vec<&crate::NormalizedPost> = result.posts.iter().collect();
        // Newest first; undated posts keep upstream order at the end.
        recent.sort_by(|a, b| b.posted_at.cmp(&a.posted_at));

        let recent_posts = recent
            .into_iter()
            .take(RECENT_POST_SUMMARIES)
            .map(|post| RecentPostSummary {
                external_post_id: post.external_post_id.clone(),
                caption_excerpt: post.caption.as_deref().map(excerpt),
                post_url: post.post_url.clone(),
                posted_at: post.posted_at,
                likes: post.likes,
                comments: post.comments,
                views: post.views,
            })
            .collect();

        Self {
            display_name: result.profile.display_name.clone(),
            bio: result.profile.bio.clone(),
            avatar_url: result.profile.avatar_url.clone(),
            is_verified: result.profile.is_verified,
            top_hashtags: result.top_hashtags.clone(),
            recent_posts,
        }
    }
}

fn excerpt(caption: &str) -> String {
    let trimmed = caption.trim();
    if trimmed.chars().count() <= CAPTION_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    let mut out: String = trimmed.chars().take(CAPTION_EXCERPT_CHARS).collect();
    out.push('…');
    out
}

/// A linked social account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocialAccount {
    pub id: i64,
    pub owner_id: Uuid,
    pub platform: Platform,
    pub external_user_id: String,
    pub external_handle: String,
    /// Never serialized: the envelopes stay inside this subsystem.
    #[serde(skip)]
    pub credential: Option<EncryptedCredential>,
    pub is_active: bool,
    pub deactivated_reason: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub metrics: AccountMetrics,
    pub metadata: AccountMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SocialAccount {
    /// Whether the account is due for a re-sync given the freshness window.
    #[must_use]
    pub fn is_stale(&self, stale_before: DateTime<Utc>) -> bool {
        self.last_synced_at.is_none_or(|at| at < stale_before)
    }
}

/// Insert payload for a newly linked account.
#[derive(Debug, Clone, PartialEq)]
pub struct NewSocialAccount {
    pub owner_id: Uuid,
    pub platform: Platform,
    pub external_user_id: String,
    pub external_handle: String,
    pub credential: Option<EncryptedCredential>,
    pub metrics: AccountMetrics,
    pub metadata: AccountMetadata,
    pub last_synced_at: Option<DateTime<Utc>>,
}
