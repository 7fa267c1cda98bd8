//! Derived audience metrics.

use std::collections::HashMap;
use std::sync::LazyLock;

use creatorsync_core::{round2, NormalizedPost};
use regex::Regex;

pub const TOP_HASHTAG_LIMIT: usize = 10;

static HASHTAG_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"#([\p{L}\p{N}_]+)").expect("valid regex"));

/// Engagement rate in percent, rounded to two decimals.
///
/// Averages `likes + comments + shares` over the posts that expose at least
/// one of those counts. When no post does, averages views instead. Followers
/// are floored at 1 so an empty audience never divides by zero.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn engagement_rate(posts: &[NormalizedPost], followers: i64) -> f64 {
    let interactions: Vec<i64> = posts
        .iter()
        .filter(|p| p.has_interaction_counts())
        .map(NormalizedPost::interactions)
        .collect();

    let samples = if interactions.is_empty() {
        posts.iter().filter_map(|p| p.views).collect()
    } else {
        interactions
    };
    if samples.is_empty() {
        return 0.0;
    }

    // Summed as f64 so upstream counts near i64::MAX cannot overflow.
    let average = samples.iter().map(|&n| n as f64).sum::<f64>() / samples.len() as f64;
    round2(average / followers.max(1) as f64 * 100.0)
}

/// Most frequent hashtags across captions, case-folded, returned with their
/// leading `#`. Ties keep the order in which tags were first seen.
#[must_use]
pub fn top_hashtags(posts: &[NormalizedPost], limit: usize) -> Vec<String> {
    let mut order: Vec<(String, usize)> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();

    let captions = posts.iter().filter_map(|p| p.caption.as_deref());
    for caption in captions {
        for cap in HASHTAG_RE.captures_iter(caption) {
            let tag = format!("#{}", cap[1].to_lowercase());
            if let Some(&i) = index.get(&tag) {
                order[i].1 += 1;
            } else {
                index.insert(tag.clone(), order.len());
                order.push((tag, 1));
            }
        }
    }

    // Stable sort keeps first-seen order among equal counts.
    order.sort_by(|a, b| b.1.cmp(&a.1));
    order.into_iter().take(limit).map(|(tag, _)| tag).collect()
}
