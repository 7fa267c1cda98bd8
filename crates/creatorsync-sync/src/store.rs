//! Persistence seams used by the orchestration layer.
//!
//! [`PgStore`] forwards to the `creatorsync-db` query functions. Tests swap
//! in an in-memory store.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use creatorsync_core::{
    AccountMetadata, AccountMetrics, EncryptedCredential, NewSocialAccount, NormalizedPost,
    Platform, SocialAccount,
};
use creatorsync_db::{DbError, PostUpsert};
use sqlx::PgPool;
use uuid::Uuid;

#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Active accounts never synced or last synced before `stale_before`,
    /// never-synced first.
    async fn due_for_sync(&self, stale_before: DateTime<Utc>) -> Result<Vec<SocialAccount>, DbError>;

    /// Active accounts on `platforms` whose token expires before
    /// `expires_before`.
    async fn expiring_credentials(
        &self,
        platforms: &[Platform],
        expires_before: DateTime<Utc>,
    ) -> Result<Vec<SocialAccount>, DbError>;

    async fn record_sync(
        &self,
        id: i64,
        metrics: &AccountMetrics,
        metadata: &AccountMetadata,
        synced_at: DateTime<Utc>,
    ) -> Result<(), DbError>;

    async fn update_credential(&self, id: i64, credential: &EncryptedCredential) -> Result<(), DbError>;

    async fn deactivate(&self, id: i64, reason: &str) -> Result<(), DbError>;

    async fn accounts_for_owner(&self, owner_id: Uuid) -> Result<Vec<SocialAccount>, DbError>;

    async fn get(&self, id: i64) -> Result<SocialAccount, DbError>;

    async fn insert(&self, account: &NewSocialAccount) -> Result<SocialAccount, DbError>;

    async fn delete(&self, id: i64) -> Result<(), DbError>;
}

#[async_trait]
pub trait PostStore: Send + Sync {
    async fn upsert_post(&self, account_id: i64, post: &NormalizedPost) -> Result<PostUpsert, DbError>;
}

#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl AccountStore for PgStore {
    async fn due_for_sync(&self, stale_before: DateTime<Utc>) -> Result<Vec<SocialAccount>, DbError> {
        creatorsync_db::list_accounts_due_for_sync(&self.pool, stale_before).await
    }

    async fn expiring_credentials(
        &self,
        platforms: &[Platform],
        expires_before: DateTime<Utc>,
    ) -> Result<Vec<SocialAccount>, DbError> {
        creatorsync_db::list_accounts_with_expiring_credentials(&self.pool, platforms, expires_before)
            .await
    }

    async fn record_sync(
        &self,
        id: i64,
        metrics: &AccountMetrics,
        metadata: &AccountMetadata,
        synced_at: DateTime<Utc>,
    ) -> Result<(), DbError> {
        creatorsync_db::record_account_sync(&self.pool, id, metrics, metadata, synced_at).await
    }

    async fn update_credential(&self, id: i64, credential: &EncryptedCredential) -> Result<(), DbError> {
        creatorsync_db::update_account_credential(&self.pool, id, credential).await
    }

    async fn deactivate(&self, id: i64, reason: &str) -> Result<(), DbError> {
        creatorsync_db::deactivate_account(&self.pool, id, reason).await
    }

    async fn accounts_for_owner(&self, owner_id: Uuid) -> Result<Vec<SocialAccount>, DbError> {
        creatorsync_db::list_accounts_for_owner(&self.pool, owner_id).await
    }

    async fn get(&self, id: i64) -> Result<SocialAccount, DbError> {
        creatorsync_db::get_social_account(&self.pool, id).await
    }

    async fn insert(&self, account: &NewSocialAccount) -> Result<SocialAccount, DbError> {
        creatorsync_db::insert_social_account(&self.pool, account).await
    }

    async fn delete(&self, id: i64) -> Result<(), DbError> {
        creatorsync_db::delete_social_account(&self.pool, id).await
    }
}

#[async_trait]
impl PostStore for PgStore {
    async fn upsert_post(&self, account_id: i64, post: &NormalizedPost) -> Result<PostUpsert, DbError> {
        creatorsync_db::upsert_content_post(&self.pool, account_id, post).await
    }
}
