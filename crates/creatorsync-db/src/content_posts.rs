//! Database operations for `content_posts`.

use chrono::{DateTime, Utc};
use creatorsync_core::{MediaDescriptor, NormalizedPost};
use sqlx::PgPool;

use crate::DbError;

/// A row from the `content_posts` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ContentPostRow {
    pub id: i64,
    pub account_id: i64,
    pub external_post_id: String,
    pub caption: Option<String>,
    pub post_url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    pub likes: Option<i64>,
    pub comments: Option<i64>,
    pub shares: Option<i64>,
    pub views: Option<i64>,
    /// jsonb array of [`MediaDescriptor`].
    pub media: serde_json::Value,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ContentPostRow {
    /// Media descriptors, or an empty list if the stored json is not an array
    /// of descriptors.
    #[must_use]
    pub fn media_descriptors(&self) -> Vec<MediaDescriptor> {
        serde_json::from_value(self.media.clone()).unwrap_or_default()
    }
}

/// Whether an upsert inserted a new row or updated an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PostUpsert {
    Created,
    Updated,
}

/// Upserts a post keyed by `(account_id, external_post_id)`.
///
/// A repeated post only refreshes its likes, comments, shares, and views.
/// Caption, URL, `posted_at`, and media keep the values from the first insert.
/// Running the same upsert twice leaves one row.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the upsert fails (including a foreign-key
/// violation for an unknown account).
pub async fn upsert_content_post(
    pool: &PgPool,
    account_id: i64,
    post: &NormalizedPost,
) -> Result<PostUpsert, DbError> {
    let media = serde_json::to_value(&post.media).map_err(|e| DbError::Decode {
        table: "content_posts",
        reason: format!("media not serializable: {e}"),
    })?;

    // xmax is 0 only for a freshly inserted tuple.
    let inserted: bool = sqlx::query_scalar::<_, bool>(
        "INSERT INTO content_posts \
             (account_id, external_post_id, caption, post_url, posted_at, \
              likes, comments, shares, views, media) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10::jsonb) \
         ON CONFLICT (account_id, external_post_id) DO UPDATE SET \
             likes      = EXCLUDED.likes, \
             comments   = EXCLUDED.comments, \
             shares     = EXCLUDED.shares, \
             views      = EXCLUDED.views, \
             updated_at = NOW() \
         RETURNING (xmax = 0)",
    )
    .bind(account_id)
    .bind(&post.external_post_id)
    .bind(&post.caption)
    .bind(&post.post_url)
    .bind(post.posted_at)
    .bind(post.likes)
    .bind(post.comments)
    .bind(post.shares)
    .bind(post.views)
    .bind(media)
    .fetch_one(pool)
    .await?;

    Ok(if inserted {
        PostUpsert::Created
    } else {
        PostUpsert::Updated
    })
}

/// Returns up to `limit` posts for an account, newest first.
///
/// # Errors
///
/// Returns [`DbError::Sqlx`] if the query fails.
pub async fn list_content_posts_for_account(
    pool: &PgPool,
    account_id: i64,
    limit: i64,
) -> Result<Vec<ContentPostRow>, DbError> {
    let rows = sqlx::query_as::<_, ContentPostRow>(
        "SELECT id, account_id, external_post_id, caption, post_url, posted_at, \
                likes, comments, shares, views, media, created_at, updated_at \
         FROM content_posts \
         WHERE account_id = $1 \
         ORDER BY posted_at DESC NULLS LAST, id DESC \
         LIMIT $2",
    )
    .bind(account_id)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
