//! Database operations for `social_accounts`.

use chrono::{DateTime, Utc};
use creatorsync_core::{
    AccountMetadata, AccountMetrics, EncryptedCredential, NewSocialAccount, Platform,
    SocialAccount,
};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{violates_unique, DbError};

const OWNER_PLATFORM_INDEX: &str = "social_accounts_owner_platform_uidx";

const ACCOUNT_COLUMNS: &str = "id, owner_id, platform, external_user_id, external_handle, \
     access_token_encrypted, refresh_token_encrypted, token_expires_at, \
     is_active, deactivated_reason, last_synced_at, \
     follower_count, following_count, content_count, engagement_rate, metadata, \
     created_at, updated_at";

// ---------------------------------------------------------------------------
// Row type
// ---------------------------------------------------------------------------

/// A row from the `social_accounts` table, before conversion to the domain
/// type.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SocialAccountRow {
    pub id: i64,
    pub owner_id: Uuid,
    pub platform: String,
    pub external_user_id: String,
    pub external_handle: String,
    pub access_token_encrypted: Option<String>,
    pub refresh_token_encrypted: Option<String>,
    pub token_expires_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub deactivated_reason: Option<String>,
    pub last_synced_at: Option<DateTime<Utc>>,
    pub follower_count: i64,
    pub following_count: Option<i64>,
    pub content_count: Option<i64>,
    /// `NUMERIC(8,2)`.
    pub engagement_rate: Decimal,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SocialAccountRow {
    /// Converts the raw row into a [`SocialAccount`].
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for an unknown platform code or metadata
    /// that does not match [`AccountMetadata`].
    pub fn into_account(self) -> Result<SocialAccount, DbError> {
        let platform: Platform = self.platform.parse().map_err(|e| DbError::Decode {
            table: "social_accounts",
            reason: format!("{e}"),
        })?;
        let metadata: AccountMetadata =
            serde_json::from_value(self.metadata).map_err(|e| DbError::Decode {
                table: "social_accounts",
                reason: format!("metadata for account {}: {e}", self.id),
            })?;

        Ok(SocialAccount {
            id: self.id,
            owner_id: self.owner_id,
            platform,
            external_user_id: self.external_user_id,
            external_handle: self.external_handle,
            credential: EncryptedCredential::from_parts(
                self.access_token_encrypted,
                self.refresh_token_encrypted,
                self.token_expires_at,
            ),
            is_active: self.is_active,
            deactivated_reason: self.deactivated_reason,
            last_synced_at: self.last_synced_at,
            metrics: AccountMetrics {
                follower_count: self.follower_count,
                following_count: self.following_count,
                content_count: self.content_count,
                engagement_rate: self.engagement_rate.to_f64().unwrap_or(0.0),
            },
            metadata,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn into_accounts(rows: Vec<SocialAccountRow>) -> Result<Vec<SocialAccount>, DbError> {
    rows.into_iter().map(SocialAccountRow::into_account).collect()
}

/// Largest value `social_accounts.engagement_rate NUMERIC(14,2)` can hold.
const MAX_ENGAGEMENT_RATE: f64 = 999_999_999_999.99;

/// Engagement rate as the two-decimal `NUMERIC` the schema stores.
///
/// Zero-follower profiles are rated against a single follower, so rates can
/// run into the millions. Anything past the column's range is clamped to its
/// maximum, and a non-finite rate is stored as 0.
fn engagement_decimal(rate: f64) -> Decimal {
    if !rate.is_finite() {
        return Decimal::ZERO;
    }
    Decimal::from_f64_retain(rate.clamp(0.0, MAX_ENGAGEMENT_RATE))
        .unwrap_or_default()
        .round_dp(2)
}

fn metadata_json(metadata: &AccountMetadata) -> Result<serde_json::Value, DbError> {
    serde_json::to_value(metadata).map_err(|e| DbError::Decode {
        table: "social_accounts",
        reason: format!("metadata not serializable: {e}"),
    })
}

// ---------------------------------------------------------------------------
// Reads
// ---------------------------------------------------------------------------

/// Fetches a single non-deleted account by id.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no live row exists, [`DbError::Decode`]
/// for corrupt rows, or [`DbError::Sqlx`] if the query fails.
pub async fn get_social_account(pool: &PgPool, id: i64) -> Result<SocialAccount, DbError> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM social_accounts \
         WHERE id = $1 AND deleted_at IS NULL"
    );
    sqlx::query_as::<_, SocialAccountRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or(DbError::NotFound)?
        .into_account()
}

/// Lists an owner's non-deleted accounts, active or not, ordered by platform.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] for
/// corrupt rows.
pub async fn list_accounts_for_owner(
    pool: &PgPool,
    owner_id: Uuid,
) -> Result<Vec<SocialAccount>, DbError> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM social_accounts \
         WHERE owner_id = $1 AND deleted_at IS NULL \
         ORDER BY platform, id"
    );
    let rows = sqlx::query_as::<_, SocialAccountRow>(&sql)
        .bind(owner_id)
        .fetch_all(pool)
        .await?;
    into_accounts(rows)
}

/// Lists active accounts that have never synced or last synced before
/// `stale_before`. Never-synced accounts come first, then oldest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] for
/// corrupt rows.
pub async fn list_accounts_due_for_sync(
    pool: &PgPool,
    stale_before: DateTime<Utc>,
) -> Result<Vec<SocialAccount>, DbError> {
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM social_accounts \
         WHERE is_active AND deleted_at IS NULL \
           AND (last_synced_at IS NULL OR last_synced_at < $1) \
         ORDER BY last_synced_at ASC NULLS FIRST, id"
    );
    let rows = sqlx::query_as::<_, SocialAccountRow>(&sql)
        .bind(stale_before)
        .fetch_all(pool)
        .await?;
    into_accounts(rows)
}

/// Lists active accounts on `platforms` whose token expires at or before
/// `expires_before`. Accounts without a recorded expiry are not returned.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails or [`DbError::Decode`] for
/// corrupt rows.
pub async fn list_accounts_with_expiring_credentials(
    pool: &PgPool,
    platforms: &[Platform],
    expires_before: DateTime<Utc>,
) -> Result<Vec<SocialAccount>, DbError> {
    if platforms.is_empty() {
        return Ok(Vec::new());
    }
    let codes: Vec<String> = platforms.iter().map(|p| p.as_str().to_string()).collect();
    let sql = format!(
        "SELECT {ACCOUNT_COLUMNS} FROM social_accounts \
         WHERE is_active AND deleted_at IS NULL \
           AND platform = ANY($1) \
           AND token_expires_at IS NOT NULL AND token_expires_at <= $2 \
         ORDER BY token_expires_at, id"
    );
    let rows = sqlx::query_as::<_, SocialAccountRow>(&sql)
        .bind(codes)
        .bind(expires_before)
        .fetch_all(pool)
        .await?;
    into_accounts(rows)
}

// ---------------------------------------------------------------------------
// Writes
// ---------------------------------------------------------------------------

/// Inserts a newly linked account and returns it.
///
/// # Errors
///
/// Returns [`DbError::DuplicateAccount`] if the owner already has a live
/// account on the platform, or [`DbError::Sqlx`] for any other failure.
pub async fn insert_social_account(
    pool: &PgPool,
    account: &NewSocialAccount,
) -> Result<SocialAccount, DbError> {
    let credential = account.credential.as_ref();
    let sql = format!(
        "INSERT INTO social_accounts \
             (owner_id, platform, external_user_id, external_handle, \
              access_token_encrypted, refresh_token_encrypted, token_expires_at, \
              follower_count, following_count, content_count, engagement_rate, metadata, \
              last_synced_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12::jsonb, $13) \
         RETURNING {ACCOUNT_COLUMNS}"
    );

    let result = sqlx::query_as::<_, SocialAccountRow>(&sql)
        .bind(account.owner_id)
        .bind(account.platform.as_str())
        .bind(&account.external_user_id)
        .bind(&account.external_handle)
        .bind(credential.and_then(|c| c.access_token.as_deref()))
        .bind(credential.and_then(|c| c.refresh_token.as_deref()))
        .bind(credential.and_then(|c| c.expires_at))
        .bind(account.metrics.follower_count)
        .bind(account.metrics.following_count)
        .bind(account.metrics.content_count)
        .bind(engagement_decimal(account.metrics.engagement_rate))
        .bind(metadata_json(&account.metadata)?)
        .bind(account.last_synced_at)
        .fetch_one(pool)
        .await;

    match result {
        Ok(row) => row.into_account(),
        Err(e) if violates_unique(&e, OWNER_PLATFORM_INDEX) => Err(DbError::DuplicateAccount {
            owner_id: account.owner_id,
            platform: account.platform,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Writes fresh metrics and metadata after a successful sync.
///
/// `last_synced_at` only moves forward: an older `synced_at` leaves the
/// stored value in place.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the account no longer exists, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn record_account_sync(
    pool: &PgPool,
    id: i64,
    metrics: &AccountMetrics,
    metadata: &AccountMetadata,
    synced_at: DateTime<Utc>,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE social_accounts SET \
             follower_count  = $2, \
             following_count = $3, \
             content_count   = $4, \
             engagement_rate = $5, \
             metadata        = $6::jsonb, \
             last_synced_at  = GREATEST(last_synced_at, $7), \
             updated_at      = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(metrics.follower_count)
    .bind(metrics.following_count)
    .bind(metrics.content_count)
    .bind(engagement_decimal(metrics.engagement_rate))
    .bind(metadata_json(metadata)?)
    .bind(synced_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Replaces the stored credential after a refresh.
///
/// A `None` refresh token keeps the existing one, since providers only
/// sometimes rotate it.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the account no longer exists, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn update_account_credential(
    pool: &PgPool,
    id: i64,
    credential: &EncryptedCredential,
) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE social_accounts SET \
             access_token_encrypted  = $2, \
             refresh_token_encrypted = COALESCE($3, refresh_token_encrypted), \
             token_expires_at        = $4, \
             updated_at              = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(credential.access_token.as_deref())
    .bind(credential.refresh_token.as_deref())
    .bind(credential.expires_at)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Marks an account inactive with a reason. Inactive accounts are skipped by
/// both scheduled processes until the owner relinks.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if the account no longer exists, or
/// [`DbError::Sqlx`] if the update fails.
pub async fn deactivate_account(pool: &PgPool, id: i64, reason: &str) -> Result<(), DbError> {
    let result = sqlx::query(
        "UPDATE social_accounts SET \
             is_active = FALSE, deactivated_reason = $2, updated_at = NOW() \
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(id)
    .bind(reason)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}

/// Hard-deletes an account. Its `content_posts` go with it via
/// `ON DELETE CASCADE`.
///
/// # Errors
///
/// Returns [`DbError::NotFound`] if no row was deleted, or [`DbError::Sqlx`]
/// if the delete fails.
pub async fn delete_social_account(pool: &PgPool, id: i64) -> Result<(), DbError> {
    let result = sqlx::query("DELETE FROM social_accounts WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::NotFound);
    }
    Ok(())
}
