//! Creating accounts: first successful scrape or OAuth grant.

use std::sync::Arc;

use async_trait::async_trait;
use creatorsync_core::{
    AccountMetadata, AccountMetrics, EncryptedCredential, NewSocialAccount, Platform, ScrapeResult,
    SocialAccount,
};
use creatorsync_db::DbError;
use creatorsync_scraper::{normalize_handle, ProfileScraper};
use creatorsync_vault::{encrypt_credential, CredentialVault};
use uuid::Uuid;

use crate::error::SyncError;
use crate::oauth::{OAuthPlatforms, TokenGrant};
use crate::scheduler::SyncDeps;
use crate::store::AccountStore;
use crate::upsert::RecordUpserter;

/// Decides which owners may hold creator accounts.
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn is_eligible(&self, owner_id: Uuid) -> bool;
}

/// Treats every owner as eligible, for deployments without an owner
/// directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllOwners;

#[async_trait]
impl OwnerDirectory for AllowAllOwners {
    async fn is_eligible(&self, _owner_id: Uuid) -> bool {
        true
    }
}

pub struct AccountLinker {
    accounts: Arc<dyn AccountStore>,
    upserter: RecordUpserter,
    scraper: Option<Arc<ProfileScraper>>,
    oauth: OAuthPlatforms,
    vault: Arc<CredentialVault>,
    directory: Arc<dyn OwnerDirectory>,
}

impl AccountLinker {
    #[must_use]
    pub fn new(deps: SyncDeps, directory: Arc<dyn OwnerDirectory>) -> Self {
        Self {
            accounts: deps.accounts,
            upserter: deps.upserter,
            scraper: deps.scraper,
            oauth: deps.oauth,
            vault: deps.vault,
            directory,
        }
    }

    /// Links a public account by handle. The account is created only if the
    /// first scrape succeeds.
    ///
    /// # Errors
    ///
    /// [`SyncError::Ineligible`], [`SyncError::AlreadyLinked`], any scrape
    /// failure, or [`SyncError::Persistence`].
    pub async fn link_scrape_only(
        &self,
        owner_id: Uuid,
        platform: Platform,
        handle: &str,
    ) -> Result<SocialAccount, SyncError> {
        if platform.requires_oauth() {
            return Err(SyncError::MissingCredential("access"));
        }
        let handle = normalize_handle(handle);
        if handle.is_empty() {
            return Err(SyncError::UpstreamNotFound { platform, handle });
        }
        self.ensure_linkable(owner_id, platform).await?;

        let scraper = self
            .scraper
            .as_ref()
            .ok_or_else(|| SyncError::NotConfigured("scrape provider".to_string()))?;
        let snapshot = scraper.scrape(platform, &handle).await?;

        let external_handle = if snapshot.profile.handle.trim().is_empty() {
            handle
        } else {
            snapshot.profile.handle.clone()
        };
        let external_user_id = snapshot
            .profile
            .external_user_id
            .clone()
            .unwrap_or_else(|| external_handle.clone());
        self.create(owner_id, platform, external_user_id, external_handle, None, &snapshot)
            .await
    }

    /// Links an OAuth account from a freshly exchanged grant. The
    /// authenticated profile is read once to learn the account's identity.
    ///
    /// # Errors
    ///
    /// [`SyncError::Ineligible`], [`SyncError::AlreadyLinked`],
    /// [`SyncError::NotConfigured`] without a client for `platform`, upstream
    /// and crypto failures, or [`SyncError::Persistence`].
    pub async fn link_oauth(
        &self,
        owner_id: Uuid,
        platform: Platform,
        grant: &TokenGrant,
    ) -> Result<SocialAccount, SyncError> {
        let client = self
            .oauth
            .get(platform)
            .filter(|_| platform.requires_oauth())
            .ok_or_else(|| SyncError::NotConfigured(format!("{platform} OAuth client")))?;
        self.ensure_linkable(owner_id, platform).await?;

        let snapshot = client.fetch_snapshot(&grant.access_token).await?;
        let credential = encrypt_credential(
            &self.vault,
            &grant.access_token,
            grant.refresh_token.as_deref(),
            grant.expires_at,
        )?;

        let external_user_id = snapshot
            .profile
            .external_user_id
            .clone()
            .unwrap_or_else(|| snapshot.profile.handle.clone());
        let external_handle = snapshot.profile.handle.clone();
        self.create(
            owner_id,
            platform,
            external_user_id,
            external_handle,
            Some(credential),
            &snapshot,
        )
        .await
    }

    async fn ensure_linkable(&self, owner_id: Uuid, platform: Platform) -> Result<(), SyncError> {
        if !self.directory.is_eligible(owner_id).await {
            return Err(SyncError::Ineligible { owner_id });
        }
        let existing = self.accounts.accounts_for_owner(owner_id).await?;
        if existing.iter().any(|a| a.platform == platform) {
            return Err(SyncError::AlreadyLinked { owner_id, platform });
        }
        Ok(())
    }

    async fn create(
        &self,
        owner_id: Uuid,
        platform: Platform,
        external_user_id: String,
        external_handle: String,
        credential: Option<EncryptedCredential>,
        snapshot: &ScrapeResult,
    ) -> Result<SocialAccount, SyncError> {
        let metrics = AccountMetrics::from_scrape(snapshot);
        let metadata = AccountMetadata::from_scrape(snapshot);
        let new = NewSocialAccount {
            owner_id,
            platform,
            external_user_id,
            external_handle,
            credential,
            metrics: metrics.clone(),
            metadata: metadata.clone(),
            // Set once the posts are in, so a failed upsert leaves the
            // account due for the next run.
            last_synced_at: None,
        };

        let account = self.accounts.insert(&new).await.map_err(|e| match e {
            DbError::DuplicateAccount { owner_id, platform } => {
                SyncError::AlreadyLinked { owner_id, platform }
            }
            other => SyncError::Persistence(other),
        })?;

        let outcome = self.upserter.upsert(account.id, &snapshot.posts).await?;
        self.accounts
            .record_sync(account.id, &metrics, &metadata, snapshot.scraped_at)
            .await?;

        tracing::info!(
            account_id = account.id,
            %owner_id,
            %platform,
            handle = %account.external_handle,
            posts = outcome.created,
            "account linked"
        );
        Ok(self.accounts.get(account.id).await?)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::events::EventBus;
    use crate::testing::{account, profile_scraper, vault, FakeOAuth, HandleProvider, MemoryStore};
    use creatorsync_vault::decrypt_access_token;

    struct DenyAll;

    #[async_trait]
    impl OwnerDirectory for DenyAll {
        async fn is_eligible(&self, _owner_id: Uuid) -> bool {
            false
        }
    }

    fn linker(store: &Arc<MemoryStore>, directory: Arc<dyn OwnerDirectory>) -> AccountLinker {
        let provider = Arc::new(HandleProvider::default().with_profile("chef.ana", &["a", "b"]));
        let deps = SyncDeps {
            accounts: store.clone(),
            upserter: RecordUpserter::new(store.clone()),
            scraper: Some(profile_scraper(provider)),
            oauth: OAuthPlatforms::new().with(FakeOAuth::new(Vec::new())),
            vault: vault(),
            events: EventBus::default(),
        };
        AccountLinker::new(deps, directory)
    }

    #[tokio::test]
    async fn scrape_only_link_creates_a_synced_account() {
        let store = MemoryStore::with_accounts(Vec::new());
        let owner = Uuid::new_v4();

        let linked = linker(&store, Arc::new(AllowAllOwners))
            .link_scrape_only(owner, Platform::PhotoNetwork, "@Chef.Ana")
            .await
            .unwrap();

        assert_eq!(linked.owner_id, owner);
        assert_eq!(linked.external_handle, "chef.ana");
        assert!(linked.credential.is_none());
        assert!(linked.last_synced_at.is_some());
        assert_eq!(linked.metrics.follower_count, 120);
        assert_eq!(store.post_count(linked.id), 2);
    }

    #[tokio::test]
    async fn unknown_handle_creates_nothing() {
        let store = MemoryStore::with_accounts(Vec::new());
        let owner = Uuid::new_v4();

        let err = linker(&store, Arc::new(AllowAllOwners))
            .link_scrape_only(owner, Platform::PhotoNetwork, "ghost")
            .await
            .unwrap_err();

        assert!(matches!(err, SyncError::UpstreamNotFound { .. }), "{err:?}");
        assert!(store.accounts_for_owner(owner).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn ineligible_owner_is_refused() {
        let store = MemoryStore::with_accounts(Vec::new());
        let err = linker(&store, Arc::new(DenyAll))
            .link_scrape_only(Uuid::new_v4(), Platform::PhotoNetwork, "chef.ana")
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::Ineligible { .. }));
    }

    #[tokio::test]
    async fn second_account_on_same_platform_is_refused() {
        let existing = account(1, Platform::PhotoNetwork, "other");
        let owner = existing.owner_id;
        let store = MemoryStore::with_accounts(vec![existing]);

        let err = linker(&store, Arc::new(AllowAllOwners))
            .link_scrape_only(owner, Platform::PhotoNetwork, "chef.ana")
            .await
            .unwrap_err();
        assert!(
            matches!(err, SyncError::AlreadyLinked { platform: Platform::PhotoNetwork, .. }),
            "{err:?}"
        );
    }

    #[tokio::test]
    async fn oauth_link_stores_encrypted_grant() {
        let store = MemoryStore::with_accounts(Vec::new());
        let grant = TokenGrant::expiring_in("tok".into(), Some("ref".into()), Some(3600), Utc::now());

        let linked = linker(&store, Arc::new(AllowAllOwners))
            .link_oauth(Uuid::new_v4(), Platform::VideoNetwork, &grant)
            .await
            .unwrap();

        let cred = linked.credential.as_ref().unwrap();
        assert_ne!(cred.access_token.as_deref(), Some("tok"));
        assert_eq!(decrypt_access_token(&vault(), cred).unwrap(), "tok");
        assert!(cred.expires_at.is_some());
        assert_eq!(store.post_count(linked.id), 2);
    }

    #[tokio::test]
    async fn oauth_link_needs_an_oauth_platform() {
        let store = MemoryStore::with_accounts(Vec::new());
        let grant = TokenGrant::expiring_in("tok".into(), None, None, Utc::now());
        let err = linker(&store, Arc::new(AllowAllOwners))
            .link_oauth(Uuid::new_v4(), Platform::PhotoNetwork, &grant)
            .await
            .unwrap_err();
        assert!(matches!(err, SyncError::NotConfigured(_)));
    }
}
