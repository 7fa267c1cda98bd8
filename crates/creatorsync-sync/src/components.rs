//! Wiring of the sync components from configuration.

use std::sync::Arc;

use chrono::Duration;
use creatorsync_core::AppConfig;
use creatorsync_scraper::{ApifyConfig, ApifyProvider, ProfileScraper, ScrapeCache, ScrapeSettings};
use creatorsync_vault::CredentialVault;
use sqlx::PgPool;

use crate::credentials::CredentialLifecycleManager;
use crate::error::SyncError;
use crate::events::EventBus;
use crate::linking::{AccountLinker, OwnerDirectory};
use crate::oauth::OAuthPlatforms;
use crate::scheduler::{SchedulerSettings, SyncDeps, SyncScheduler};
use crate::service::AccountService;
use crate::store::PgStore;
use crate::upsert::RecordUpserter;
use crate::video_network::{VideoNetworkClient, VideoNetworkConfig};

/// Long-lived components shared by the server and the CLI.
pub struct Components {
    pub deps: SyncDeps,
    pub scheduler: Arc<SyncScheduler>,
    pub credentials: Arc<CredentialLifecycleManager>,
    pub service: AccountService,
}

impl Components {
    /// # Errors
    ///
    /// Returns [`SyncError::Crypto`] for an unusable vault secret, or an
    /// upstream error if an HTTP client cannot be built.
    pub fn build(pool: PgPool, config: &AppConfig) -> Result<Self, SyncError> {
        let store = Arc::new(PgStore::new(pool.clone()));
        let vault = Arc::new(CredentialVault::new(&config.vault_secret)?);
        let events = EventBus::default();

        let scraper = match ApifyConfig::from_app_config(config) {
            Some(apify) => {
                let provider = ApifyProvider::new(apify)?;
                let cache = ScrapeCache::new(Duration::days(config.cache_ttl_days));
                Some(Arc::new(ProfileScraper::new(
                    Arc::new(provider),
                    Arc::new(cache),
                    ScrapeSettings::from_app_config(config),
                )))
            }
            None => {
                tracing::warn!("APIFY_TOKEN not set; scrape-only accounts will not sync");
                None
            }
        };

        let mut oauth = OAuthPlatforms::new();
        match VideoNetworkConfig::from_app_config(config) {
            Some(video) => oauth = oauth.with(Arc::new(VideoNetworkClient::new(video)?)),
            None => tracing::warn!("video network OAuth client not configured"),
        }

        let deps = SyncDeps {
            accounts: store.clone(),
            upserter: RecordUpserter::new(store.clone()),
            scraper,
            oauth: oauth.clone(),
            vault: Arc::clone(&vault),
            events: events.clone(),
        };
        let scheduler = Arc::new(SyncScheduler::new(
            deps.clone(),
            SchedulerSettings::from_app_config(config),
        ));
        let credentials = Arc::new(CredentialLifecycleManager::new(
            store.clone(),
            vault,
            oauth,
            events,
        ));
        let service = AccountService::new(store, Arc::clone(&scheduler)).with_run_log(pool);

        Ok(Self {
            deps,
            scheduler,
            credentials,
            service,
        })
    }

    #[must_use]
    pub fn linker(&self, directory: Arc<dyn OwnerDirectory>) -> AccountLinker {
        AccountLinker::new(self.deps.clone(), directory)
    }

    #[must_use]
    pub fn events(&self) -> &EventBus {
        &self.deps.events
    }
}
