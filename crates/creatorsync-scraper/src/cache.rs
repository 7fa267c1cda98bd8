//! In-process TTL cache of scrape results.

use chrono::{DateTime, Duration, Utc};
use creatorsync_core::{Platform, ScrapeResult};
use dashmap::DashMap;

pub const DEFAULT_TTL_DAYS: i64 = 7;

/// Canonical cache key form of a handle: trimmed, leading `@` removed,
/// lowercased.
#[must_use]
pub fn normalize_handle(handle: &str) -> String {
    handle.trim().trim_start_matches('@').to_lowercase()
}

/// Scrape results keyed by platform and normalized handle.
///
/// An entry is fresh until `scraped_at + ttl`. Nothing is persisted across
/// restarts. Safe to share behind an `Arc` between the scheduled sync and
/// manual triggers.
#[derive(Debug)]
pub struct ScrapeCache {
    entries: DashMap<(Platform, String), ScrapeResult>,
    ttl: Duration,
}

impl Default for ScrapeCache {
    fn default() -> Self {
        Self::new(Duration::days(DEFAULT_TTL_DAYS))
    }
}

impl ScrapeCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    #[must_use]
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    #[must_use]
    pub fn get(&self, platform: Platform, handle: &str) -> Option<ScrapeResult> {
        self.get_at(platform, handle, Utc::now())
    }

    /// Looks up a fresh entry as of `now`. An expired entry is evicted.
    #[must_use]
    pub fn get_at(&self, platform: Platform, handle: &str, now: DateTime<Utc>) -> Option<ScrapeResult> {
        let key = (platform, normalize_handle(handle));
        let hit = self.entries.get(&key).map(|entry| {
            let fresh = self.is_fresh(&entry, now);
            (fresh, entry.value().clone())
        });

        match hit {
            Some((true, result)) => Some(result),
            Some((false, _)) => {
                // The read guard is dropped above, so removal cannot deadlock.
                self.entries
                    .remove_if(&key, |_, result| !self.is_fresh(result, now));
                None
            }
            None => None,
        }
    }

    pub fn put(&self, platform: Platform, handle: &str, result: ScrapeResult) {
        self.entries
            .insert((platform, normalize_handle(handle)), result);
    }

    /// Drops every expired entry and returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Utc::now())
    }

    pub fn purge_expired_at(&self, now: DateTime<Utc>) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, result| self.is_fresh(result, now));
        before.saturating_sub(self.entries.len())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn is_fresh(&self, result: &ScrapeResult, now: DateTime<Utc>) -> bool {
        now < result.scraped_at + self.ttl
    }
}
