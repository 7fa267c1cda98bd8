//! Canonical profile and content records produced by the scraper and the
//! OAuth platform clients.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A media attachment on a post (image, video, or thumbnail URL).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaDescriptor {
    /// `"image"`, `"video"`, or `"thumbnail"`.
    pub kind: String,
    pub url: String,
}

/// Canonical content item, keyed by `external_post_id` within an account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedPost {
    pub external_post_id: String,
    pub caption: Option<String>,
    pub post_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub views: Option<i64>,
    pub media: Vec<MediaDescriptor>,
}

impl NormalizedPost {
    /// Creates a post with only its identity set.
    #[must_use]
    pub fn new(external_post_id: impl Into<String>) -> Self {
        Self {
            external_post_id: external_post_id.into(),
            caption: None,
            post_url: None,
            posted_at: None,
            likes: None,
            comments: None,
            shares: None,
            views: None,
            media: Vec::new(),
        }
    }

    /// Whether the post carries any like, comment, or share count.
    #[must_use]
    pub fn has_interaction_counts(&self) -> bool {
        self.likes.is_some() || self.comments.is_some() || self.shares.is_some()
    }

    /// `likes + comments + shares`, treating missing counts as zero and
    /// saturating at `i64::MAX`.
    #[must_use]
    pub fn interactions(&self) -> i64 {
        self.likes
            .unwrap_or(0)
            .saturating_add(self.comments.unwrap_or(0))
            .saturating_add(self.shares.unwrap_or(0))
    }
}

/// Canonical profile extracted from an upstream payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProfile {
    pub handle: String,
    pub external_user_id: Option<String>,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
    pub follower_count: i64,
    pub following_count: Option<i64>,
    pub content_count: Option<i64>,
}

impl ScrapedProfile {
    /// A profile with only a handle, used when upstream returns content but
    /// no profile-like item.
    #[must_use]
    pub fn bare(handle: impl Into<String>) -> Self {
        Self {
            handle: handle.into(),
            external_user_id: None,
            display_name: None,
            bio: None,
            avatar_url: None,
            is_verified: false,
            follower_count: 0,
            following_count: None,
            content_count: None,
        }
    }
}

/// Transient result of one scrape or authenticated fetch. Never persisted
/// as-is; the sync scheduler maps it onto the account and its posts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeResult {
    pub profile: ScrapedProfile,
    pub posts: Vec<NormalizedPost>,
    pub engagement_rate: f64,
    pub top_hashtags: Vec<String>,
    pub scraped_at: DateTime<Utc>,
}

/// Round to two decimal places (half away from zero).
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
