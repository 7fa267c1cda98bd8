//! Turns a provider item list into a canonical [`ScrapeResult`].

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use creatorsync_core::{MediaDescriptor, NormalizedPost, ScrapeResult, ScrapedProfile};
use serde_json::{Map, Value};

use crate::classify::{classify, nested_content, ItemKind};
use crate::fields::{
    first_bool, first_count, first_id, first_str, first_timestamp, AVATAR_KEYS, BIO_KEYS,
    CAPTION_KEYS, COMMENT_KEYS, CONTENT_COUNT_KEYS, DISPLAY_NAME_KEYS, FOLLOWER_KEYS,
    FOLLOWING_KEYS, HANDLE_KEYS, LIKE_KEYS, OWNER_HANDLE_KEYS, OWNER_KEYS, POST_ID_KEYS,
    POST_URL_KEYS, SHARE_KEYS, TIMESTAMP_KEYS, USER_ID_KEYS, VERIFIED_KEYS, VIEW_KEYS,
};
use crate::metrics::{engagement_rate, top_hashtags, TOP_HASHTAG_LIMIT};

/// Posts in arrival order, first occurrence of each id wins.
#[derive(Default)]
struct PostCollector {
    seen: HashSet<String>,
    posts: Vec<NormalizedPost>,
}

impl PostCollector {
    fn push(&mut self, post: NormalizedPost) {
        if self.seen.insert(post.external_post_id.clone()) {
            self.posts.push(post);
        }
    }
}

/// Normalizes raw provider items for `handle`.
///
/// The first profile-like item supplies the profile. Failing that, the first
/// owner object embedded in a content item does, and failing that a bare
/// profile with zero followers. Returns `None` when the items yield neither a
/// profile nor any post.
#[must_use]
pub fn normalize_items(
    handle: &str,
    items: &[Value],
    scraped_at: DateTime<Utc>,
) -> Option<ScrapeResult> {
    let mut profile: Option<ScrapedProfile> = None;
    let mut owner_fallback: Option<ScrapedProfile> = None;
    let mut posts = PostCollector::default();
    let mut unrecognized = 0usize;

    for item in items.iter().filter_map(Value::as_object) {
        match classify(item) {
            ItemKind::Profile => {
                if profile.is_none() {
                    profile = Some(extract_profile(item, HANDLE_KEYS, handle));
                }
            }
            ItemKind::Content => {
                if let Some(post) = extract_post(item) {
                    posts.push(post);
                }
                if owner_fallback.is_none() {
                    owner_fallback = extract_owner(item);
                }
            }
            ItemKind::Unrecognized => {
                unrecognized += 1;
                continue;
            }
        }
        for nested in nested_content(item) {
            if let Some(post) = extract_post(nested) {
                posts.push(post);
            }
        }
    }

    if unrecognized > 0 {
        tracing::debug!(handle, unrecognized, "ignored unrecognized provider items");
    }
    if profile.is_none() && owner_fallback.is_none() && posts.posts.is_empty() {
        return None;
    }

    let profile = profile
        .or(owner_fallback)
        .unwrap_or_else(|| ScrapedProfile::bare(handle));
    let posts = posts.posts;

    Some(ScrapeResult {
        engagement_rate: engagement_rate(&posts, profile.follower_count),
        top_hashtags: top_hashtags(&posts, TOP_HASHTAG_LIMIT),
        profile,
        posts,
        scraped_at,
    })
}

fn extract_profile(item: &Map<String, Value>, handle_keys: &[&str], fallback: &str) -> ScrapedProfile {
    let handle = first_str(item, handle_keys)
        .unwrap_or(fallback)
        .trim_start_matches('@')
        .to_string();

    ScrapedProfile {
        handle,
        external_user_id: first_id(item, USER_ID_KEYS),
        display_name: first_str(item, DISPLAY_NAME_KEYS).map(String::from),
        bio: first_str(item, BIO_KEYS).map(String::from),
        avatar_url: first_str(item, AVATAR_KEYS).map(String::from),
        is_verified: first_bool(item, VERIFIED_KEYS).unwrap_or(false),
        follower_count: first_count(item, FOLLOWER_KEYS).unwrap_or(0),
        following_count: first_count(item, FOLLOWING_KEYS),
        content_count: first_count(item, CONTENT_COUNT_KEYS),
    }
}

/// Profile from an owner object embedded in a content item, or from flat
/// `owner*` fields on the item itself.
fn extract_owner(item: &Map<String, Value>) -> Option<ScrapedProfile> {
    let embedded = OWNER_KEYS
        .iter()
        .filter_map(|k| item.get(*k))
        .filter_map(Value::as_object)
        .find(|owner| first_str(owner, OWNER_HANDLE_KEYS).is_some());
    if let Some(owner) = embedded {
        return Some(extract_profile(owner, OWNER_HANDLE_KEYS, ""));
    }

    let handle = first_str(item, &["ownerUsername"])?;
    Some(ScrapedProfile {
        external_user_id: first_id(item, &["ownerId"]),
        display_name: first_str(item, &["ownerFullName"]).map(String::from),
        ..ScrapedProfile::bare(handle.trim_start_matches('@'))
    })
}

fn extract_post(item: &Map<String, Value>) -> Option<NormalizedPost> {
    let id = first_id(item, POST_ID_KEYS)?;

    Some(NormalizedPost {
        caption: first_str(item, CAPTION_KEYS).map(String::from),
        post_url: first_str(item, POST_URL_KEYS).map(String::from),
        posted_at: first_timestamp(item, TIMESTAMP_KEYS),
        likes: first_count(item, LIKE_KEYS),
        comments: first_count(item, COMMENT_KEYS),
        shares: first_count(item, SHARE_KEYS),
        views: first_count(item, VIEW_KEYS),
        media: extract_media(item),
        external_post_id: id,
    })
}

fn extract_media(item: &Map<String, Value>) -> Vec<MediaDescriptor> {
    let mut media = Vec::new();
    let mut push = |kind: &str, url: &str| {
        if !url.is_empty() && !media.iter().any(|m: &MediaDescriptor| m.url == url) {
            media.push(MediaDescriptor {
                kind: kind.to_string(),
                url: url.to_string(),
            });
        }
    };

    if let Some(url) = first_str(item, &["displayUrl", "imageUrl"]) {
        push("image", url);
    }
    if let Some(images) = item.get("images").and_then(Value::as_array) {
        for url in images.iter().filter_map(Value::as_str) {
            push("image", url);
        }
    }
    if let Some(url) = first_str(item, &["videoUrl"]) {
        push("video", url);
    }
    let cover = first_str(item, &["thumbnailUrl", "coverUrl"]).or_else(|| {
        item.get("videoMeta")
            .and_then(Value::as_object)
            .and_then(|meta| first_str(meta, &["coverUrl"]))
    });
    if let Some(url) = cover {
        push("thumbnail", url);
    }
    media
}
