//! External social platforms a creator account can be linked to.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A social platform supported by the sync subsystem.
///
/// Photo and short-video networks are scrape-only: their data comes from the
/// public scraping backend and no credential is ever stored for them. The
/// video network is linked through an OAuth grant and synced with the
/// creator's own access token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    PhotoNetwork,
    ShortVideoNetwork,
    VideoNetwork,
}

impl Platform {
    pub const ALL: [Platform; 3] = [
        Platform::PhotoNetwork,
        Platform::ShortVideoNetwork,
        Platform::VideoNetwork,
    ];

    /// Stable code persisted in `social_accounts.platform`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Platform::PhotoNetwork => "photo_network",
            Platform::ShortVideoNetwork => "short_video_network",
            Platform::VideoNetwork => "video_network",
        }
    }

    /// Whether accounts on this platform hold an OAuth credential.
    #[must_use]
    pub fn requires_oauth(self) -> bool {
        matches!(self, Platform::VideoNetwork)
    }

    /// Codes of every platform that uses OAuth credentials.
    #[must_use]
    pub fn oauth_codes() -> Vec<&'static str> {
        Self::ALL
            .iter()
            .filter(|p| p.requires_oauth())
            .map(|p| p.as_str())
            .collect()
    }

    /// Public profile URL for a handle, used by URL-shaped scrape inputs.
    #[must_use]
    pub fn profile_url(self, handle: &str) -> String {
        let handle = handle.trim().trim_start_matches('@');
        match self {
            Platform::PhotoNetwork => format!("https://www.instagram.com/{handle}/"),
            Platform::ShortVideoNetwork => format!("https://www.tiktok.com/@{handle}"),
            Platform::VideoNetwork => format!("https://www.youtube.com/@{handle}"),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "photo_network" => Ok(Platform::PhotoNetwork),
            "short_video_network" => Ok(Platform::ShortVideoNetwork),
            "video_network" => Ok(Platform::VideoNetwork),
            other => Err(CoreError::UnknownPlatform(other.to_string())),
        }
    }
}
