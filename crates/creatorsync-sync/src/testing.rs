//! In-memory doubles shared by the unit tests in this crate.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use creatorsync_core::{
    AccountMetadata, AccountMetrics, EncryptedCredential, NewSocialAccount, NormalizedPost,
    Platform, ScrapeResult, ScrapedProfile, SocialAccount,
};
use creatorsync_db::{DbError, PostUpsert};
use creatorsync_scraper::{ProfileScraper, ScrapeCache, ScrapeProvider, ScrapeSettings, ScraperError};
use creatorsync_vault::{CredentialVault, MIN_KDF_ITERATIONS};
use serde_json::{json, Value};
use tokio::sync::Notify;
use uuid::Uuid;

use crate::oauth::{OAuthError, OAuthPlatform, TokenGrant};
use crate::store::{AccountStore, PostStore};

pub(crate) fn vault() -> Arc<CredentialVault> {
    Arc::new(CredentialVault::with_iterations("unit-test-secret", MIN_KDF_ITERATIONS).unwrap())
}

pub(crate) fn account(id: i64, platform: Platform, handle: &str) -> SocialAccount {
    let now = Utc::now();
    SocialAccount {
        id,
        owner_id: Uuid::new_v4(),
        platform,
        external_user_id: format!("ext-{id}"),
        external_handle: handle.to_string(),
        credential: None,
        is_active: true,
        deactivated_reason: None,
        last_synced_at: None,
        metrics: AccountMetrics::default(),
        metadata: AccountMetadata::default(),
        created_at: now,
        updated_at: now,
    }
}

pub(crate) fn snapshot(handle: &str, post_ids: &[&str]) -> ScrapeResult {
    let posts = post_ids
        .iter()
        .map(|id| NormalizedPost {
            likes: Some(10),
            ..NormalizedPost::new(*id)
        })
        .collect();
    ScrapeResult {
        profile: ScrapedProfile {
            follower_count: 100,
            ..ScrapedProfile::bare(handle)
        },
        posts,
        engagement_rate: 10.0,
        top_hashtags: Vec::new(),
        scraped_at: Utc::now(),
    }
}

#[derive(Default)]
pub(crate) struct MemoryStore {
    accounts: Mutex<Vec<SocialAccount>>,
    posts: Mutex<HashMap<(i64, String), NormalizedPost>>,
    fail_record_sync: Mutex<HashSet<i64>>,
    fail_credential_update: Mutex<HashSet<i64>>,
    fail_posts: Mutex<HashSet<i64>>,
}

impl MemoryStore {
    pub(crate) fn with_accounts(accounts: Vec<SocialAccount>) -> Arc<Self> {
        Arc::new(Self {
            accounts: Mutex::new(accounts),
            ..Self::default()
        })
    }

    pub(crate) fn account(&self, id: i64) -> SocialAccount {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .unwrap()
    }

    pub(crate) fn post_count(&self, account_id: i64) -> usize {
        self.posts
            .lock()
            .unwrap()
            .keys()
            .filter(|(id, _)| *id == account_id)
            .count()
    }

    pub(crate) fn fail_record_sync_for(&self, id: i64) {
        self.fail_record_sync.lock().unwrap().insert(id);
    }

    pub(crate) fn fail_credential_update_for(&self, id: i64) {
        self.fail_credential_update.lock().unwrap().insert(id);
    }

    pub(crate) fn fail_posts_for(&self, id: i64) {
        self.fail_posts.lock().unwrap().insert(id);
    }

    fn modify(&self, id: i64, f: impl FnOnce(&mut SocialAccount)) -> Result<(), DbError> {
        let mut accounts = self.accounts.lock().unwrap();
        let account = accounts.iter_mut().find(|a| a.id == id).ok_or(DbError::NotFound)?;
        f(account);
        account.updated_at = Utc::now();
        Ok(())
    }
}

fn injected(table: &'static str) -> DbError {
    DbError::Decode {
        table,
        reason: "injected failure".to_string(),
    }
}

#[async_trait]
impl AccountStore for MemoryStore {
    async fn due_for_sync(&self, stale_before: DateTime<Utc>) -> Result<Vec<SocialAccount>, DbError> {
        let mut due: Vec<SocialAccount> = self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.is_active && a.is_stale(stale_before))
            .cloned()
            .collect();
        due.sort_by_key(|a| (a.last_synced_at, a.id));
        Ok(due)
    }

    async fn expiring_credentials(
        &self,
        platforms: &[Platform],
        expires_before: DateTime<Utc>,
    ) -> Result<Vec<SocialAccount>, DbError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.is_active && platforms.contains(&a.platform))
            .filter(|a| {
                a.credential
                    .as_ref()
                    .and_then(|c| c.expires_at)
                    .is_some_and(|at| at < expires_before)
            })
            .cloned()
            .collect())
    }

    async fn record_sync(
        &self,
        id: i64,
        metrics: &AccountMetrics,
        metadata: &AccountMetadata,
        synced_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        if self.fail_record_sync.lock().unwrap().contains(&id) {
            return Err(injected("social_accounts"));
        }
        self.modify(id, |a| {
            a.metrics = metrics.clone();
            a.metadata = metadata.clone();
            a.last_synced_at = Some(a.last_synced_at.map_or(synced_at, |at| at.max(synced_at)));
        })
    }

    async fn update_credential(&self, id: i64, credential: &EncryptedCredential) -> Result<(), DbError> {
        if self.fail_credential_update.lock().unwrap().contains(&id) {
            return Err(injected("social_accounts"));
        }
        self.modify(id, |a| {
            let kept_refresh = a.credential.as_ref().and_then(|c| c.refresh_token.clone());
            a.credential = Some(EncryptedCredential {
                access_token: credential.access_token.clone(),
                refresh_token: credential.refresh_token.clone().or(kept_refresh),
                expires_at: credential.expires_at,
            });
        })
    }

    async fn deactivate(&self, id: i64, reason: &str) -> Result<(), DbError> {
        self.modify(id, |a| {
            a.is_active = false;
            a.deactivated_reason = Some(reason.to_string());
        })
    }

    async fn accounts_for_owner(&self, owner_id: Uuid) -> Result<Vec<SocialAccount>, DbError> {
        Ok(self
            .accounts
            .lock()
            .unwrap()
            .iter()
            .filter(|a| a.owner_id == owner_id)
            .cloned()
            .collect())
    }

    async fn get(&self, id: i64) -> Result<SocialAccount, DbError> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.id == id)
            .cloned()
            .ok_or(DbError::NotFound)
    }

    async fn insert(&self, new: &NewSocialAccount) -> Result<SocialAccount, DbError> {
        let mut accounts = self.accounts.lock().unwrap();
        if accounts
            .iter()
            .any(|a| a.owner_id == new.owner_id && a.platform == new.platform)
        {
            return Err(DbError::DuplicateAccount {
                owner_id: new.owner_id,
                platform: new.platform,
            });
        }
        let id = accounts.iter().map(|a| a.id).max().unwrap_or(0) + 1;
        let now = Utc::now();
        let account = SocialAccount {
            id,
            owner_id: new.owner_id,
            platform: new.platform,
            external_user_id: new.external_user_id.clone(),
            external_handle: new.external_handle.clone(),
            credential: new.credential.clone(),
            is_active: true,
            deactivated_reason: None,
            last_synced_at: new.last_synced_at,
            metrics: new.metrics.clone(),
            metadata: new.metadata.clone(),
            created_at: now,
            updated_at: now,
        };
        accounts.push(account.clone());
        Ok(account)
    }

    async fn delete(&self, id: i64) -> Result<(), DbError> {
        let mut accounts = self.accounts.lock().unwrap();
        let before = accounts.len();
        accounts.retain(|a| a.id != id);
        if accounts.len() == before {
            return Err(DbError::NotFound);
        }
        self.posts.lock().unwrap().retain(|(account_id, _), _| *account_id != id);
        Ok(())
    }
}

#[async_trait]
impl PostStore for MemoryStore {
    async fn upsert_post(&self, account_id: i64, post: &NormalizedPost) -> Result<PostUpsert, DbError> {
        if self.fail_posts.lock().unwrap().contains(&account_id) {
            return Err(injected("content_posts"));
        }
        let key = (account_id, post.external_post_id.clone());
        let previous = self.posts.lock().unwrap().insert(key, post.clone());
        Ok(if previous.is_some() {
            PostUpsert::Updated
        } else {
            PostUpsert::Created
        })
    }
}

/// Scrape provider keyed by handle. Handles without an entry return no
/// items; handles listed in `failing` return a server error.
#[derive(Default)]
pub(crate) struct HandleProvider {
    items: HashMap<String, Vec<Value>>,
    failing: HashSet<String>,
    calls: AtomicUsize,
    /// When set, every call signals `entered` then waits for `release`.
    gate: Option<(Arc<Notify>, Arc<Notify>)>,
}

impl HandleProvider {
    pub(crate) fn with_profile(mut self, handle: &str, post_ids: &[&str]) -> Self {
        let posts: Vec<Value> = post_ids
            .iter()
            .map(|id| json!({"id": id, "likesCount": 10, "commentsCount": 2}))
            .collect();
        self.items.insert(
            handle.to_string(),
            vec![json!({"username": handle, "followersCount": 120, "latestPosts": posts})],
        );
        self
    }

    pub(crate) fn failing(mut self, handle: &str) -> Self {
        self.failing.insert(handle.to_string());
        self
    }

    pub(crate) fn gated(mut self, entered: Arc<Notify>, release: Arc<Notify>) -> Self {
        self.gate = Some((entered, release));
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

fn target_handle(input: &Value) -> String {
    ["handles", "usernames", "profiles"]
        .iter()
        .find_map(|key| input.get(*key))
        .and_then(|v| v.get(0))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl ScrapeProvider for HandleProvider {
    async fn run(&self, _platform: Platform, input: &Value) -> Result<Vec<Value>, ScraperError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((entered, release)) = &self.gate {
            entered.notify_one();
            release.notified().await;
        }
        let handle = target_handle(input);
        if self.failing.contains(&handle) {
            return Err(ScraperError::Api {
                status: 400,
                message: format!("actor rejected {handle}"),
            });
        }
        Ok(self.items.get(&handle).cloned().unwrap_or_default())
    }
}

pub(crate) fn profile_scraper(provider: Arc<HandleProvider>) -> Arc<ProfileScraper> {
    Arc::new(ProfileScraper::new(
        provider,
        Arc::new(ScrapeCache::default()),
        ScrapeSettings {
            max_items: 10,
            max_variant_attempts: 1,
        },
    ))
}

/// OAuth client double: refresh answers come from a queue, snapshots are
/// fixed.
pub(crate) struct FakeOAuth {
    platform: Platform,
    refreshes: Mutex<VecDeque<Result<TokenGrant, OAuthError>>>,
    snapshot: ScrapeResult,
    pub(crate) refresh_calls: AtomicUsize,
    pub(crate) fetch_calls: AtomicUsize,
    pub(crate) seen_access_tokens: Mutex<Vec<String>>,
}

impl FakeOAuth {
    pub(crate) fn new(refreshes: Vec<Result<TokenGrant, OAuthError>>) -> Arc<Self> {
        Arc::new(Self {
            platform: Platform::VideoNetwork,
            refreshes: Mutex::new(refreshes.into()),
            snapshot: snapshot("studio", &["v1", "v2"]),
            refresh_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            seen_access_tokens: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait]
impl OAuthPlatform for FakeOAuth {
    fn platform(&self) -> Platform {
        self.platform
    }

    async fn refresh(&self, _refresh_token: &str) -> Result<TokenGrant, OAuthError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        self.refreshes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(OAuthError::Rejected {
                    status: 400,
                    message: "invalid_grant".to_string(),
                })
            })
    }

    async fn fetch_snapshot(&self, access_token: &str) -> Result<ScrapeResult, OAuthError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.seen_access_tokens
            .lock()
            .unwrap()
            .push(access_token.to_string());
        Ok(self.snapshot.clone())
    }
}
