use std::sync::atomic::Ordering;
use std::sync::Arc;

use chrono::{Duration, Utc};
use creatorsync_core::{Platform, SocialAccount};
use creatorsync_vault::encrypt_credential;
use tokio::sync::Notify;

use super::*;
use crate::credentials::CredentialLifecycleManager;
use crate::oauth::OAuthError;
use crate::report::FailureKind;
use crate::testing::{account, profile_scraper, vault, FakeOAuth, HandleProvider, MemoryStore};

fn scheduler_with(
    store: &Arc<MemoryStore>,
    scraper: Option<Arc<ProfileScraper>>,
    oauth: OAuthPlatforms,
    events: EventBus,
) -> SyncScheduler {
    SyncScheduler::new(
        SyncDeps {
            accounts: store.clone(),
            upserter: RecordUpserter::new(store.clone()),
            scraper,
            oauth,
            vault: vault(),
            events,
        },
        SchedulerSettings {
            freshness: Duration::days(7),
            inter_account_delay: std::time::Duration::ZERO,
        },
    )
}

fn scrape_scheduler(store: &Arc<MemoryStore>, provider: Arc<HandleProvider>) -> SyncScheduler {
    scheduler_with(
        store,
        Some(profile_scraper(provider)),
        OAuthPlatforms::new(),
        EventBus::default(),
    )
}

fn video_account(id: i64, expires_in: Duration) -> SocialAccount {
    let credential = encrypt_credential(
        &vault(),
        "live-access",
        Some("refresh-1"),
        Some(Utc::now() + expires_in),
    )
    .unwrap();
    SocialAccount {
        credential: Some(credential),
        ..account(id, Platform::VideoNetwork, "studio")
    }
}

// ---------------------------------------------------------------------------
// Scrape-only accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn due_accounts_are_synced_and_recorded() {
    let store = MemoryStore::with_accounts(vec![
        account(1, Platform::PhotoNetwork, "chef.ana"),
        account(2, Platform::ShortVideoNetwork, "dancer"),
    ]);
    let provider = Arc::new(
        HandleProvider::default()
            .with_profile("chef.ana", &["a", "b", "c"])
            .with_profile("dancer", &["x"]),
    );

    let report = scrape_scheduler(&store, provider)
        .run_once(SyncTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(report.success, 2);
    assert_eq!(report.failed, 0);
    assert_eq!(store.post_count(1), 3);
    assert_eq!(store.post_count(2), 1);

    let synced = store.account(1);
    assert!(synced.last_synced_at.is_some());
    assert_eq!(synced.metrics.follower_count, 120);
    assert_eq!(synced.metadata.recent_posts.len(), 3);
}

#[tokio::test]
async fn one_failing_account_does_not_stop_the_batch() {
    let store = MemoryStore::with_accounts(vec![
        account(1, Platform::PhotoNetwork, "ghost"),
        account(2, Platform::PhotoNetwork, "chef.ana"),
    ]);
    let provider = Arc::new(HandleProvider::default().with_profile("chef.ana", &["a"]));

    let report = scrape_scheduler(&store, provider)
        .run_once(SyncTrigger::Scheduler)
        .await
        .unwrap();

    assert_eq!(report.success, 1);
    assert_eq!(report.failed, 1);
    let failure = &report.failures[0];
    assert_eq!(failure.account_id, 1);
    assert_eq!(failure.handle, "ghost");
    assert_eq!(failure.kind, FailureKind::UpstreamNotFound);
    assert!(store.account(1).last_synced_at.is_none());
    assert!(store.account(2).last_synced_at.is_some());
}

#[tokio::test]
async fn failed_metadata_write_leaves_last_synced_at_untouched() {
    let store = MemoryStore::with_accounts(vec![account(1, Platform::PhotoNetwork, "chef.ana")]);
    store.fail_record_sync_for(1);
    let provider = Arc::new(HandleProvider::default().with_profile("chef.ana", &["a"]));

    let report = scrape_scheduler(&store, provider)
        .run_once(SyncTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(report.failures[0].kind, FailureKind::Persistence);
    assert!(store.account(1).last_synced_at.is_none());
}

#[tokio::test]
async fn fresh_and_inactive_accounts_are_not_selected() {
    let fresh = SocialAccount {
        last_synced_at: Some(Utc::now() - Duration::days(1)),
        ..account(1, Platform::PhotoNetwork, "fresh")
    };
    let inactive = SocialAccount {
        is_active: false,
        ..account(2, Platform::PhotoNetwork, "gone")
    };
    let store = MemoryStore::with_accounts(vec![fresh, inactive]);
    let provider = Arc::new(HandleProvider::default());

    let report = scrape_scheduler(&store, Arc::clone(&provider))
        .run_once(SyncTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(report.success + report.failed, 0);
    assert_eq!(provider.calls(), 0);
}

#[tokio::test]
async fn missing_scrape_provider_is_reported_per_account() {
    let store = MemoryStore::with_accounts(vec![account(1, Platform::PhotoNetwork, "chef.ana")]);

    let report = scheduler_with(&store, None, OAuthPlatforms::new(), EventBus::default())
        .run_once(SyncTrigger::Cli)
        .await
        .unwrap();

    assert_eq!(report.failures[0].kind, FailureKind::NotConfigured);
}

// ---------------------------------------------------------------------------
// OAuth accounts
// ---------------------------------------------------------------------------

#[tokio::test]
async fn oauth_account_is_fetched_with_decrypted_token() {
    let store = MemoryStore::with_accounts(vec![video_account(1, Duration::days(10))]);
    let oauth = FakeOAuth::new(Vec::new());

    let report = scheduler_with(
        &store,
        None,
        OAuthPlatforms::new().with(oauth.clone()),
        EventBus::default(),
    )
    .run_once(SyncTrigger::Manual)
    .await
    .unwrap();

    assert_eq!(report.success, 1);
    assert_eq!(
        oauth.seen_access_tokens.lock().unwrap().as_slice(),
        ["live-access".to_string()]
    );
    assert_eq!(store.post_count(1), 2);
}

#[tokio::test]
async fn expired_credential_is_reported_without_calling_upstream() {
    let store = MemoryStore::with_accounts(vec![video_account(1, -Duration::hours(1))]);
    let oauth = FakeOAuth::new(Vec::new());

    let report = scheduler_with(
        &store,
        None,
        OAuthPlatforms::new().with(oauth.clone()),
        EventBus::default(),
    )
    .run_once(SyncTrigger::Manual)
    .await
    .unwrap();

    assert_eq!(report.failures[0].kind, FailureKind::CredentialExpired);
    assert_eq!(oauth.fetch_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn account_deactivated_by_refresh_failure_is_skipped_next_run() {
    let store = MemoryStore::with_accounts(vec![video_account(1, Duration::days(1))]);
    let oauth = FakeOAuth::new(vec![Err(OAuthError::Rejected {
        status: 400,
        message: "invalid_grant".to_string(),
    })]);
    let platforms = OAuthPlatforms::new().with(oauth.clone());
    let events = EventBus::default();

    let manager = CredentialLifecycleManager::new(
        store.clone(),
        vault(),
        platforms.clone(),
        events.clone(),
    );
    let refresh = manager.refresh_expiring(7).await.unwrap();
    assert_eq!(refresh.deactivated, 1);

    let report = scheduler_with(&store, None, platforms, events)
        .run_once(SyncTrigger::Scheduler)
        .await
        .unwrap();

    assert_eq!(report.success + report.failed, 0);
    assert_eq!(oauth.fetch_calls.load(Ordering::SeqCst), 0);
}

// ---------------------------------------------------------------------------
// Run control
// ---------------------------------------------------------------------------

#[tokio::test]
async fn overlapping_run_is_skipped_and_stop_ends_the_batch() {
    let store = MemoryStore::with_accounts(vec![
        account(1, Platform::PhotoNetwork, "first"),
        account(2, Platform::PhotoNetwork, "second"),
    ]);
    let entered = Arc::new(Notify::new());
    let release = Arc::new(Notify::new());
    let provider = Arc::new(
        HandleProvider::default()
            .with_profile("first", &["a"])
            .with_profile("second", &["b"])
            .gated(Arc::clone(&entered), Arc::clone(&release)),
    );
    let scheduler = Arc::new(scrape_scheduler(&store, Arc::clone(&provider)));

    let running = {
        let scheduler = Arc::clone(&scheduler);
        tokio::spawn(async move { scheduler.run_once(SyncTrigger::Scheduler).await })
    };
    entered.notified().await;
    assert!(scheduler.is_running());

    let overlapping = scheduler.run_once(SyncTrigger::Manual).await.unwrap();
    assert!(overlapping.skipped);
    assert_eq!(overlapping.success + overlapping.failed, 0);

    scheduler.request_stop();
    release.notify_one();
    let first = running.await.unwrap().unwrap();

    assert!(!first.skipped);
    assert!(first.stopped);
    assert_eq!(first.success, 1);
    assert_eq!(provider.calls(), 1);
    assert!(store.account(2).last_synced_at.is_none());
    assert!(!scheduler.is_running());
}

#[tokio::test]
async fn completed_run_is_announced() {
    let store = MemoryStore::with_accounts(vec![account(1, Platform::PhotoNetwork, "chef.ana")]);
    let provider = Arc::new(HandleProvider::default().with_profile("chef.ana", &["a"]));
    let events = EventBus::default();
    let mut rx = events.subscribe();

    scheduler_with(&store, Some(profile_scraper(provider)), OAuthPlatforms::new(), events)
        .run_once(SyncTrigger::Manual)
        .await
        .unwrap();

    assert_eq!(
        rx.recv().await.unwrap(),
        SyncEvent::SyncCompleted {
            trigger: SyncTrigger::Manual,
            success: 1,
            failed: 0,
            stopped: false,
        }
    );
}
