//! Field-name vocabularies and value parsers for loosely shaped provider
//! items. Keys are listed in lookup priority order.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

pub(crate) const HANDLE_KEYS: &[&str] = &[
    "username",
    "userName",
    "handle",
    "uniqueId",
    "ownerUsername",
    "profileUsername",
];
/// Embedded owner objects also use a bare `name` for the handle.
pub(crate) const OWNER_HANDLE_KEYS: &[&str] = &[
    "username", "userName", "handle", "uniqueId", "name",
];
pub(crate) const USER_ID_KEYS: &[&str] = &["id", "userId", "pk", "ownerId"];
pub(crate) const DISPLAY_NAME_KEYS: &[&str] = &["fullName", "nickName", "nickname", "displayName"];
pub(crate) const BIO_KEYS: &[&str] = &["biography", "bio", "signature", "description"];
pub(crate) const AVATAR_KEYS: &[&str] = &["profilePicUrlHD", "profilePicUrl", "avatarUrl", "avatar"];
pub(crate) const VERIFIED_KEYS: &[&str] = &["verified", "isVerified"];

pub(crate) const FOLLOWER_KEYS: &[&str] = &[
    "followersCount",
    "followerCount",
    "followers",
    "fans",
    "subscriberCount",
    "subscribersCount",
];
pub(crate) const FOLLOWING_KEYS: &[&str] = &["followsCount", "followingCount", "following"];
pub(crate) const CONTENT_COUNT_KEYS: &[&str] =
    &["postsCount", "mediaCount", "videoCount", "videosCount"];

pub(crate) const POST_ID_KEYS: &[&str] = &["id", "postId", "videoId", "awemeId", "shortCode"];
pub(crate) const LIKE_KEYS: &[&str] = &["likesCount", "likeCount", "likes", "diggCount", "heartCount"];
pub(crate) const COMMENT_KEYS: &[&str] = &["commentsCount", "commentCount", "comments"];
pub(crate) const SHARE_KEYS: &[&str] = &["sharesCount", "shareCount", "shares"];
pub(crate) const VIEW_KEYS: &[&str] = &[
    "videoViewCount",
    "videoPlayCount",
    "playCount",
    "viewCount",
    "views",
];
pub(crate) const CAPTION_KEYS: &[&str] = &["caption", "text", "description", "title"];
pub(crate) const POST_URL_KEYS: &[&str] = &["url", "webVideoUrl", "postUrl"];
pub(crate) const TIMESTAMP_KEYS: &[&str] = &[
    "timestamp",
    "createTimeISO",
    "createTime",
    "takenAtTimestamp",
    "takenAt",
    "publishedAt",
];

pub(crate) const NESTED_CONTENT_KEYS: &[&str] = &["latestPosts", "posts", "videos", "items"];
pub(crate) const OWNER_KEYS: &[&str] = &["authorMeta", "owner", "author"];

/// Seconds-vs-milliseconds cutoff: 1e11 seconds is the year 5138.
const MILLIS_THRESHOLD: i64 = 100_000_000_000;

/// First non-blank string value under any of `keys`.
pub(crate) fn first_str<'a>(map: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|k| map.get(*k))
        .filter_map(Value::as_str)
        .map(str::trim)
        .find(|s| !s.is_empty())
}

/// First identifier under any of `keys`. Numeric ids are rendered as strings.
pub(crate) fn first_id(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().filter_map(|k| map.get(*k)).find_map(|v| match v {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

/// First value under any of `keys` that parses as a count.
pub(crate) fn first_count(map: &Map<String, Value>, keys: &[&str]) -> Option<i64> {
    keys.iter().filter_map(|k| map.get(*k)).find_map(parse_count)
}

pub(crate) fn first_bool(map: &Map<String, Value>, keys: &[&str]) -> Option<bool> {
    keys.iter().filter_map(|k| map.get(*k)).find_map(Value::as_bool)
}

pub(crate) fn first_timestamp(map: &Map<String, Value>, keys: &[&str]) -> Option<DateTime<Utc>> {
    keys.iter().filter_map(|k| map.get(*k)).find_map(parse_timestamp)
}

/// Parses a non-negative count from a JSON number or a display string such
/// as `"1,234"`, `"12.5K"`, or `"3M"`.
#[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
pub fn parse_count(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.is_finite())
                .map(|f| f.round() as i64)
        }),
        Value::String(s) => parse_count_str(s),
        _ => None,
    }
    .filter(|n| *n >= 0)
}

#[allow(clippy::cast_possible_truncation)]
fn parse_count_str(raw: &str) -> Option<i64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| !matches!(c, ',' | '_' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    let (digits, multiplier) = match cleaned.chars().last()?.to_ascii_uppercase() {
        'K' => (&cleaned[..cleaned.len() - 1], 1_000.0),
        'M' => (&cleaned[..cleaned.len() - 1], 1_000_000.0),
        'B' => (&cleaned[..cleaned.len() - 1], 1_000_000_000.0),
        _ => (cleaned.as_str(), 1.0),
    };

    if let Ok(n) = digits.parse::<i64>() {
        if (multiplier - 1.0_f64).abs() < f64::EPSILON {
            return Some(n);
        }
    }
    let value = digits.parse::<f64>().ok()? * multiplier;
    value.is_finite().then(|| value.round() as i64)
}

/// Parses an RFC 3339 string, or unix seconds/milliseconds given as a
/// number or a numeric string.
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            s.parse::<i64>().ok().and_then(from_unix)
        }
        Value::Number(n) => n.as_i64().and_then(from_unix),
        _ => None,
    }
}

fn from_unix(raw: i64) -> Option<DateTime<Utc>> {
    if raw <= 0 {
        return None;
    }
    if raw >= MILLIS_THRESHOLD {
        DateTime::from_timestamp_millis(raw)
    } else {
        DateTime::from_timestamp(raw, 0)
    }
}
