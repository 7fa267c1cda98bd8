//! Scrape provider seam and its Apify implementation.

use std::time::Duration;

use async_trait::async_trait;
use creatorsync_core::{AppConfig, Platform};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::time::Instant;

use crate::error::ScraperError;
use crate::rate_limit::retry_with_backoff;

/// Longest single long-poll Apify accepts.
const MAX_WAIT_FOR_FINISH_SECS: u64 = 60;
/// Pause between polls when the provider answers before the run finishes.
const POLL_PAUSE: Duration = Duration::from_secs(1);

/// Runs one scrape for a platform and returns the raw result items.
#[async_trait]
pub trait ScrapeProvider: Send + Sync {
    /// # Errors
    ///
    /// Returns [`ScraperError::UpstreamTimeout`] if the run does not finish in
    /// time, or any transport/provider error.
    async fn run(&self, platform: Platform, input: &Value) -> Result<Vec<Value>, ScraperError>;
}

/// Connection settings for [`ApifyProvider`].
#[derive(Clone)]
pub struct ApifyConfig {
    pub base_url: String,
    pub token: String,
    pub photo_actor_id: String,
    pub short_video_actor_id: String,
    /// Upper bound on how long one run may take, start to finish.
    pub run_timeout: Duration,
    pub max_retries: u32,
    pub backoff_base_secs: u64,
}

impl std::fmt::Debug for ApifyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApifyConfig")
            .field("base_url", &self.base_url)
            .field("token", &"[redacted]")
            .field("photo_actor_id", &self.photo_actor_id)
            .field("short_video_actor_id", &self.short_video_actor_id)
            .field("run_timeout", &self.run_timeout)
            .field("max_retries", &self.max_retries)
            .field("backoff_base_secs", &self.backoff_base_secs)
            .finish()
    }
}

impl ApifyConfig {
    /// `None` when no `APIFY_TOKEN` is configured.
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Option<Self> {
        let token = config.apify_token.clone()?;
        Some(Self {
            base_url: config.scrape_base_url.trim_end_matches('/').to_string(),
            token,
            photo_actor_id: config.photo_actor_id.clone(),
            short_video_actor_id: config.short_video_actor_id.clone(),
            run_timeout: Duration::from_secs(config.scrape_timeout_secs),
            max_retries: config.scrape_max_retries,
            backoff_base_secs: config.scrape_retry_backoff_base_secs,
        })
    }
}

#[derive(Debug, Deserialize)]
struct RunEnvelope {
    data: RunData,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunData {
    id: String,
    status: String,
    default_dataset_id: String,
}

/// Apify REST client: start an actor run, long-poll it to completion within
/// `run_timeout`, then read its default dataset.
pub struct ApifyProvider {
    client: Client,
    config: ApifyConfig,
}

impl ApifyProvider {
    /// # Errors
    ///
    /// Returns [`ScraperError::Http`] if the HTTP client cannot be built.
    pub fn new(config: ApifyConfig) -> Result<Self, ScraperError> {
        let client = Client::builder()
            // Each request may long-poll for up to a minute.
            .timeout(Duration::from_secs(MAX_WAIT_FOR_FINISH_SECS + 30))
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self { client, config })
    }

    fn actor_for(&self, platform: Platform) -> Result<&str, ScraperError> {
        match platform {
            Platform::PhotoNetwork => Ok(&self.config.photo_actor_id),
            Platform::ShortVideoNetwork => Ok(&self.config.short_video_actor_id),
            Platform::VideoNetwork => Err(ScraperError::UnsupportedPlatform(platform)),
        }
    }

    async fn start_run(&self, actor: &str, input: &Value) -> Result<RunData, ScraperError> {
        let url = format!("{}/acts/{actor}/runs", self.config.base_url);
        let url = url.as_str();
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_secs, move || async move {
            let response = self
                .client
                .post(url)
                .bearer_auth(&self.config.token)
                .json(input)
                .send()
                .await?;
            let envelope: RunEnvelope = read_json(response, "actor run start").await?;
            Ok(envelope.data)
        })
        .await
    }

    async fn wait_for_run(&self, run: RunData) -> Result<RunData, ScraperError> {
        let started = Instant::now();
        let deadline = started + self.config.run_timeout;
        let mut run = run;

        loop {
            match run.status.as_str() {
                "SUCCEEDED" => return Ok(run),
                "FAILED" | "ABORTED" | "TIMED-OUT" => {
                    return Err(ScraperError::RunFailed {
                        run_id: run.id,
                        status: run.status,
                    });
                }
                _ => {}
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(ScraperError::UpstreamTimeout {
                    run_id: run.id,
                    waited_secs: started.elapsed().as_secs(),
                });
            }

            let wait_secs = remaining.as_secs().min(MAX_WAIT_FOR_FINISH_SECS);
            let url = format!(
                "{}/actor-runs/{}?waitForFinish={wait_secs}",
                self.config.base_url, run.id
            );
            let url = url.as_str();
            let polled = retry_with_backoff(
                self.config.max_retries,
                self.config.backoff_base_secs,
                move || async move {
                    let response = self
                        .client
                        .get(url)
                        .bearer_auth(&self.config.token)
                        .send()
                        .await?;
                    let envelope: RunEnvelope = read_json(response, "actor run status").await?;
                    Ok(envelope.data)
                },
            )
            .await?;

            tracing::debug!(run_id = %polled.id, status = %polled.status, "scrape run polled");
            if !matches!(
                polled.status.as_str(),
                "SUCCEEDED" | "FAILED" | "ABORTED" | "TIMED-OUT"
            ) {
                let pause = POLL_PAUSE.min(deadline.saturating_duration_since(Instant::now()));
                tokio::time::sleep(pause).await;
            }
            run = polled;
        }
    }

    async fn dataset_items(&self, dataset_id: &str) -> Result<Vec<Value>, ScraperError> {
        let url = format!(
            "{}/datasets/{dataset_id}/items?format=json&clean=true",
            self.config.base_url
        );
        let url = url.as_str();
        retry_with_backoff(self.config.max_retries, self.config.backoff_base_secs, move || async move {
            let response = self
                .client
                .get(url)
                .bearer_auth(&self.config.token)
                .send()
                .await?;
            read_json(response, "dataset items").await
        })
        .await
    }
}

#[async_trait]
impl ScrapeProvider for ApifyProvider {
    async fn run(&self, platform: Platform, input: &Value) -> Result<Vec<Value>, ScraperError> {
        let actor = self.actor_for(platform)?;
        let run = self.start_run(actor, input).await?;
        tracing::debug!(run_id = %run.id, actor, %platform, "scrape run started");

        let finished = self.wait_for_run(run).await?;
        let items = self.dataset_items(&finished.default_dataset_id).await?;
        tracing::debug!(
            run_id = %finished.id,
            count = items.len(),
            "scrape run items fetched"
        );
        Ok(items)
    }
}

/// Maps non-2xx responses to typed errors, then decodes the body.
async fn read_json<T: DeserializeOwned>(
    response: Response,
    context: &str,
) -> Result<T, ScraperError> {
    let status = response.status();
    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok())
            .unwrap_or(0);
        return Err(ScraperError::RateLimited { retry_after_secs });
    }
    if !status.is_success() {
        let message = response.text().await.unwrap_or_default();
        return Err(ScraperError::Api {
            status: status.as_u16(),
            message,
        });
    }

    let body = response.text().await?;
    serde_json::from_str(&body).map_err(|source| ScraperError::Deserialize {
        context: context.to_string(),
        source,
    })
}
