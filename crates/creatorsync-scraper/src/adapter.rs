//! Cache-first profile scraping with input-variant fallback.

use std::sync::Arc;

use chrono::Utc;
use creatorsync_core::{AppConfig, Platform, ScrapeResult};
use serde_json::Value;

use crate::cache::ScrapeCache;
use crate::error::ScraperError;
use crate::normalize::normalize_items;
use crate::provider::ScrapeProvider;
use crate::variants::InputVariant;

#[derive(Debug, Clone, Copy)]
pub struct ScrapeSettings {
    pub max_items: u32,
    /// How many input variants to try before giving up.
    pub max_variant_attempts: usize,
}

impl Default for ScrapeSettings {
    fn default() -> Self {
        Self {
            max_items: 30,
            max_variant_attempts: InputVariant::ORDER.len(),
        }
    }
}

impl ScrapeSettings {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            max_items: config.scrape_max_items,
            max_variant_attempts: config.scrape_max_variant_attempts,
        }
    }
}

pub struct ProfileScraper {
    provider: Arc<dyn ScrapeProvider>,
    cache: Arc<ScrapeCache>,
    settings: ScrapeSettings,
}

impl ProfileScraper {
    #[must_use]
    pub fn new(
        provider: Arc<dyn ScrapeProvider>,
        cache: Arc<ScrapeCache>,
        settings: ScrapeSettings,
    ) -> Self {
        Self {
            provider,
            cache,
            settings,
        }
    }

    #[must_use]
    pub fn cache(&self) -> &Arc<ScrapeCache> {
        &self.cache
    }

    /// Scrapes a public profile, serving a fresh cached result when present.
    ///
    /// Input variants are tried in [`InputVariant::ORDER`]; the first one
    /// that returns any items is normalized and cached. A provider timeout
    /// ends the attempt immediately. Other provider errors move on to the
    /// next variant.
    ///
    /// # Errors
    ///
    /// - [`ScraperError::UpstreamTimeout`] if a provider run outlives its deadline.
    /// - [`ScraperError::UpstreamNotFound`] if no variant produced a usable
    ///   profile or post.
    pub async fn scrape(&self, platform: Platform, handle: &str) -> Result<ScrapeResult, ScraperError> {
        if let Some(hit) = self.cache.get(platform, handle) {
            tracing::debug!(%platform, handle, "scrape cache hit");
            return Ok(hit);
        }

        let items = self.first_nonempty_variant(platform, handle).await?;
        let not_found = || ScraperError::UpstreamNotFound {
            platform,
            handle: handle.to_string(),
        };
        let items = items.ok_or_else(not_found)?;

        let result = normalize_items(handle, &items, Utc::now()).ok_or_else(not_found)?;
        tracing::info!(
            %platform,
            handle,
            followers = result.profile.follower_count,
            posts = result.posts.len(),
            engagement_rate = result.engagement_rate,
            "profile scraped"
        );
        self.cache.put(platform, handle, result.clone());
        Ok(result)
    }

    async fn first_nonempty_variant(
        &self,
        platform: Platform,
        handle: &str,
    ) -> Result<Option<Vec<Value>>, ScraperError> {
        let attempts = self.settings.max_variant_attempts.max(1);

        for variant in InputVariant::ORDER.into_iter().take(attempts) {
            let input = variant.build_input(platform, handle, self.settings.max_items);
            match self.provider.run(platform, &input).await {
                Ok(items) if !items.is_empty() => {
                    tracing::debug!(
                        %platform,
                        handle,
                        variant = variant.name(),
                        count = items.len(),
                        "input variant returned items"
                    );
                    return Ok(Some(items));
                }
                Ok(_) => {
                    tracing::debug!(%platform, handle, variant = variant.name(), "input variant returned no items");
                }
                Err(e @ ScraperError::UpstreamTimeout { .. }) => return Err(e),
                Err(e) => {
                    tracing::warn!(
                        %platform,
                        handle,
                        variant = variant.name(),
                        error = %e,
                        "input variant failed, trying next"
                    );
                }
            }
        }
        Ok(None)
    }
}
