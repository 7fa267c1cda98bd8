//! `ProfileScraper` behaviour against a scripted in-process provider.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{Duration, Utc};
use creatorsync_core::{Platform, ScrapeResult, ScrapedProfile};
use creatorsync_scraper::{
    ProfileScraper, ScrapeCache, ScrapeProvider, ScrapeSettings, ScraperError,
};
use serde_json::{json, Value};

type Reply = Result<Vec<Value>, ScraperError>;

/// Replays scripted replies in order and records every input it receives.
/// Once the script runs out it answers with an empty item list.
#[derive(Default)]
struct ScriptedProvider {
    replies: Mutex<VecDeque<Reply>>,
    inputs: Mutex<Vec<Value>>,
}

impl ScriptedProvider {
    fn new(replies: Vec<Reply>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            inputs: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.inputs.lock().unwrap().len()
    }

    fn input(&self, i: usize) -> Value {
        self.inputs.lock().unwrap()[i].clone()
    }
}

#[async_trait]
impl ScrapeProvider for ScriptedProvider {
    async fn run(&self, _platform: Platform, input: &Value) -> Result<Vec<Value>, ScraperError> {
        self.inputs.lock().unwrap().push(input.clone());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(Vec::new()))
    }
}

fn profile_items() -> Vec<Value> {
    vec![json!({
        "username": "chef.ana",
        "followersCount": 100,
        "latestPosts": [
            {"id": "a", "likesCount": 10, "commentsCount": 1, "sharesCount": 0},
            {"id": "b", "likesCount": 20, "commentsCount": 2, "sharesCount": 0},
            {"id": "c", "likesCount": 30, "commentsCount": 3, "sharesCount": 0}
        ]
    })]
}

fn scraper(provider: Arc<ScriptedProvider>, cache: Arc<ScrapeCache>) -> ProfileScraper {
    ProfileScraper::new(provider, cache, ScrapeSettings::default())
}

#[tokio::test]
async fn second_scrape_within_ttl_is_served_from_cache() {
    let provider = ScriptedProvider::new(vec![Ok(profile_items())]);
    let scraper = scraper(Arc::clone(&provider), Arc::new(ScrapeCache::default()));

    let first = scraper.scrape(Platform::PhotoNetwork, "chef.ana").await.unwrap();
    let second = scraper.scrape(Platform::PhotoNetwork, "@Chef.Ana").await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(first, second);
    assert!((first.engagement_rate - 22.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn expired_cache_entry_triggers_a_new_scrape() {
    let cache = Arc::new(ScrapeCache::default());
    cache.put(
        Platform::PhotoNetwork,
        "chef.ana",
        ScrapeResult {
            profile: ScrapedProfile::bare("chef.ana"),
            posts: Vec::new(),
            engagement_rate: 0.0,
            top_hashtags: Vec::new(),
            scraped_at: Utc::now() - Duration::days(8),
        },
    );
    let provider = ScriptedProvider::new(vec![Ok(profile_items())]);
    let scraper = scraper(Arc::clone(&provider), Arc::clone(&cache));

    let result = scraper.scrape(Platform::PhotoNetwork, "chef.ana").await.unwrap();

    assert_eq!(provider.calls(), 1);
    assert_eq!(result.profile.follower_count, 100);
    assert_eq!(cache.len(), 1);
}

#[tokio::test]
async fn falls_back_to_third_variant_when_first_two_are_empty() {
    let five: Vec<Value> = (1..=5)
        .map(|i| json!({"id": format!("p{i}"), "likesCount": i * 10, "ownerUsername": "chef.ana"}))
        .collect();
    let provider = ScriptedProvider::new(vec![Ok(Vec::new()), Ok(Vec::new()), Ok(five)]);
    let scraper = scraper(Arc::clone(&provider), Arc::new(ScrapeCache::default()));

    let result = scraper.scrape(Platform::PhotoNetwork, "chef.ana").await.unwrap();

    assert_eq!(provider.calls(), 3);
    assert!(provider.input(0).get("handles").is_some());
    assert!(provider.input(1).get("usernames").is_some());
    assert!(provider.input(2).get("profiles").is_some());
    assert_eq!(result.posts.len(), 5);
    assert_eq!(result.profile.handle, "chef.ana");
}

#[tokio::test]
async fn provider_errors_move_on_to_the_next_variant() {
    let provider = ScriptedProvider::new(vec![
        Err(ScraperError::Api {
            status: 400,
            message: "unknown field handles".to_string(),
        }),
        Ok(profile_items()),
    ]);
    let scraper = scraper(Arc::clone(&provider), Arc::new(ScrapeCache::default()));

    let result = scraper.scrape(Platform::PhotoNetwork, "chef.ana").await.unwrap();
    assert_eq!(provider.calls(), 2);
    assert_eq!(result.posts.len(), 3);
}

#[tokio::test]
async fn timeout_aborts_without_trying_more_variants() {
    let provider = ScriptedProvider::new(vec![Err(ScraperError::UpstreamTimeout {
        run_id: "r1".to_string(),
        waited_secs: 120,
    })]);
    let cache = Arc::new(ScrapeCache::default());
    let scraper = scraper(Arc::clone(&provider), Arc::clone(&cache));

    let err = scraper
        .scrape(Platform::PhotoNetwork, "chef.ana")
        .await
        .unwrap_err();

    assert!(matches!(err, ScraperError::UpstreamTimeout { .. }), "{err:?}");
    assert_eq!(provider.calls(), 1);
    assert!(cache.is_empty());
}

#[tokio::test]
async fn exhausting_every_variant_is_not_found() {
    let provider = ScriptedProvider::new(Vec::new());
    let scraper = scraper(Arc::clone(&provider), Arc::new(ScrapeCache::default()));

    let err = scraper
        .scrape(Platform::ShortVideoNetwork, "ghost")
        .await
        .unwrap_err();

    assert!(
        matches!(err, ScraperError::UpstreamNotFound { platform: Platform::ShortVideoNetwork, ref handle } if handle == "ghost"),
        "{err:?}"
    );
    assert_eq!(provider.calls(), 4);
}

#[tokio::test]
async fn variant_attempts_are_capped() {
    let provider = ScriptedProvider::new(Vec::new());
    let scraper = ProfileScraper::new(
        Arc::clone(&provider) as Arc<dyn ScrapeProvider>,
        Arc::new(ScrapeCache::default()),
        ScrapeSettings {
            max_items: 10,
            max_variant_attempts: 2,
        },
    );

    assert!(scraper.scrape(Platform::PhotoNetwork, "ghost").await.is_err());
    assert_eq!(provider.calls(), 2);
}

#[tokio::test]
async fn items_without_usable_data_are_not_found() {
    let provider = ScriptedProvider::new(vec![Ok(vec![json!({"error": "private account"})])]);
    let scraper = scraper(Arc::clone(&provider), Arc::new(ScrapeCache::default()));

    let err = scraper
        .scrape(Platform::PhotoNetwork, "private")
        .await
        .unwrap_err();
    assert!(matches!(err, ScraperError::UpstreamNotFound { .. }));
    // The first non-empty variant wins even when its items are unusable.
    assert_eq!(provider.calls(), 1);
}
