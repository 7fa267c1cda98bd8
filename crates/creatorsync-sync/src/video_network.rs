//! OAuth client for the long-form video network.
//!
//! Token refresh is a form-encoded `refresh_token` grant. Data reads are three
//! bearer-authenticated calls: the caller's channel, a search for its recent
//! uploads, then a batch lookup of those videos' statistics.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use creatorsync_core::{AppConfig, MediaDescriptor, NormalizedPost, Platform, ScrapeResult, ScrapedProfile};
use creatorsync_scraper::metrics::{engagement_rate, top_hashtags, TOP_HASHTAG_LIMIT};
use creatorsync_scraper::{parse_count, parse_timestamp};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

use crate::oauth::{OAuthError, OAuthPlatform, TokenGrant};

/// Page size ceiling the search endpoint accepts.
const MAX_SEARCH_RESULTS: u32 = 50;

#[derive(Clone)]
pub struct VideoNetworkConfig {
    pub client_id: String,
    pub client_secret: String,
    pub token_url: String,
    pub api_base_url: String,
    pub max_results: u32,
    pub request_timeout: Duration,
}

impl std::fmt::Debug for VideoNetworkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VideoNetworkConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[redacted]")
            .field("token_url", &self.token_url)
            .field("api_base_url", &self.api_base_url)
            .field("max_results", &self.max_results)
            .finish_non_exhaustive()
    }
}

impl VideoNetworkConfig {
    /// `None` unless both client id and secret are configured.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let client_id = config.video_oauth_client_id.clone()?;
        let client_secret = config.video_oauth_client_secret.clone()?;
        Some(Self {
            client_id,
            client_secret,
            token_url: config.video_oauth_token_url.clone(),
            api_base_url: config.video_api_base_url.clone(),
            max_results: config.scrape_max_items,
            request_timeout: Duration::from_secs(30),
        })
    }
}

pub struct VideoNetworkClient {
    client: Client,
    config: VideoNetworkConfig,
}

impl VideoNetworkClient {
    /// # Errors
    ///
    /// Returns [`OAuthError::Http`] if the HTTP client cannot be built.
    pub fn new(config: VideoNetworkConfig) -> Result<Self, OAuthError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    fn api_url(&self, resource: &str) -> String {
        format!("{}/{resource}", self.config.api_base_url.trim_end_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        resource: &'static str,
        query: &[(&str, &str)],
        access_token: &str,
    ) -> Result<T, OAuthError> {
        let response = self
            .client
            .get(self.api_url(resource))
            .bearer_auth(access_token)
            .query(query)
            .send()
            .await?;
        read_json(response, resource).await
    }

    async fn recent_video_ids(&self, access_token: &str) -> Result<Vec<String>, OAuthError> {
        let max_results = self.config.max_results.clamp(1, MAX_SEARCH_RESULTS).to_string();
        let search: ListResponse<SearchItem> = self
            .get_json(
                "search",
                &[
                    ("part", "snippet"),
                    ("forMine", "true"),
                    ("type", "video"),
                    ("order", "date"),
                    ("maxResults", &max_results),
                ],
                access_token,
            )
            .await?;
        Ok(search
            .items
            .into_iter()
            .filter_map(|item| item.id.video_id)
            .filter(|id| !id.is_empty())
            .collect())
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, context: &'static str) -> Result<T, OAuthError> {
    let status = response.status();
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(OAuthError::Api {
            status: status.as_u16(),
            message,
        });
    }
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|source| OAuthError::Deserialize { context, source })
}

#[async_trait]
impl OAuthPlatform for VideoNetworkClient {
    fn platform(&self) -> Platform {
        Platform::VideoNetwork
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenGrant, OAuthError> {
        let response = self
            .client
            .post(&self.config.token_url)
            .form(&[
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            let message = response.text().await.unwrap_or_default();
            return Err(OAuthError::Rejected {
                status: status.as_u16(),
                message,
            });
        }

        let body: TokenResponse = read_json(response, "token endpoint").await?;
        Ok(TokenGrant::expiring_in(
            body.access_token,
            body.refresh_token,
            body.expires_in,
            Utc::now(),
        ))
    }

    async fn fetch_snapshot(&self, access_token: &str) -> Result<ScrapeResult, OAuthError> {
        let channels: ListResponse<Channel> = self
            .get_json(
                "channels",
                &[("part", "snippet,statistics"), ("mine", "true")],
                access_token,
            )
            .await?;
        let channel = channels.items.into_iter().next().ok_or(OAuthError::NoChannel)?;

        let ids = self.recent_video_ids(access_token).await?;
        let videos = if ids.is_empty() {
            Vec::new()
        } else {
            let joined = ids.join(",");
            let list: ListResponse<Video> = self
                .get_json(
                    "videos",
                    &[("part", "statistics,snippet"), ("id", &joined)],
                    access_token,
                )
                .await?;
            list.items
        };

        let profile = channel.into_profile();
        let posts: Vec<NormalizedPost> = videos.into_iter().map(Video::into_post).collect();
        tracing::debug!(
            handle = %profile.handle,
            videos = posts.len(),
            "video network snapshot fetched"
        );

        Ok(ScrapeResult {
            engagement_rate: engagement_rate(&posts, profile.follower_count),
            top_hashtags: top_hashtags(&posts, TOP_HASHTAG_LIMIT),
            profile,
            posts,
            scraped_at: Utc::now(),
        })
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    expires_in: Option<i64>,
}

#[derive(Deserialize)]
struct ListResponse<T> {
    #[serde(default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Deserialize)]
struct SearchItem {
    id: SearchId,
}

#[derive(Deserialize)]
struct SearchId {
    #[serde(rename = "videoId")]
    video_id: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Default, Deserialize)]
struct Thumbnails {
    default: Option<Thumbnail>,
    medium: Option<Thumbnail>,
    high: Option<Thumbnail>,
}

impl Thumbnails {
    fn best(self) -> Option<String> {
        self.high.or(self.medium).or(self.default).map(|t| t.url)
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Statistics {
    subscriber_count: Option<Value>,
    video_count: Option<Value>,
    view_count: Option<Value>,
    like_count: Option<Value>,
    comment_count: Option<Value>,
}

fn count(value: Option<&Value>) -> Option<i64> {
    value.and_then(parse_count)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChannelSnippet {
    title: Option<String>,
    description: Option<String>,
    custom_url: Option<String>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    #[serde(default)]
    snippet: ChannelSnippet,
    #[serde(default)]
    statistics: Statistics,
}

impl Channel {
    fn into_profile(self) -> ScrapedProfile {
        let handle = self
            .snippet
            .custom_url
            .as_deref()
            .map(|url| url.trim_start_matches('@').to_string())
            .filter(|h| !h.is_empty())
            .unwrap_or_else(|| self.id.clone());

        ScrapedProfile {
            external_user_id: Some(self.id),
            display_name: self.snippet.title,
            bio: self.snippet.description.filter(|d| !d.is_empty()),
            avatar_url: self.snippet.thumbnails.best(),
            follower_count: count(self.statistics.subscriber_count.as_ref()).unwrap_or(0),
            content_count: count(self.statistics.video_count.as_ref()),
            ..ScrapedProfile::bare(handle)
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VideoSnippet {
    title: Option<String>,
    description: Option<String>,
    published_at: Option<Value>,
    #[serde(default)]
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct Video {
    id: String,
    #[serde(default)]
    snippet: VideoSnippet,
    #[serde(default)]
    statistics: Statistics,
}

impl Video {
    fn into_post(self) -> NormalizedPost {
        let caption = match (self.snippet.title, self.snippet.description) {
            (Some(title), Some(desc)) if !desc.trim().is_empty() => Some(format!("{title}\n\n{desc}")),
            (title, desc) => title.or(desc),
        };
        let media = self
            .snippet
            .thumbnails
            .best()
            .map(|url| MediaDescriptor {
                kind: "thumbnail".to_string(),
                url,
            })
            .into_iter()
            .collect();

        NormalizedPost {
            caption,
            post_url: Some(format!("https://www.youtube.com/watch?v={}", self.id)),
            posted_at: self.snippet.published_at.as_ref().and_then(parse_timestamp),
            likes: count(self.statistics.like_count.as_ref()),
            comments: count(self.statistics.comment_count.as_ref()),
            views: count(self.statistics.view_count.as_ref()),
            media,
            ..NormalizedPost::new(self.id)
        }
    }
}
