//! Shape classification for provider items.

use serde_json::{Map, Value};

use crate::fields::{
    first_count, first_id, first_str, COMMENT_KEYS, FOLLOWER_KEYS, HANDLE_KEYS, LIKE_KEYS,
    NESTED_CONTENT_KEYS, POST_ID_KEYS, SHARE_KEYS,
};

/// What a provider item looks like.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemKind {
    /// Exposes a handle and a follower count.
    Profile,
    /// Exposes an id with interaction counts, or carries a nested content list.
    Content,
    Unrecognized,
}

/// Classifies an item by which fields it exposes. Profile takes precedence
/// over content, so a profile carrying its latest posts is still a profile.
#[must_use]
pub fn classify(item: &Map<String, Value>) -> ItemKind {
    let has_handle = first_str(item, HANDLE_KEYS).is_some();
    let has_followers = first_count(item, FOLLOWER_KEYS).is_some();
    if has_handle && has_followers {
        return ItemKind::Profile;
    }

    let has_id = first_id(item, POST_ID_KEYS).is_some();
    let has_interactions = [LIKE_KEYS, COMMENT_KEYS, SHARE_KEYS]
        .iter()
        .any(|keys| first_count(item, keys).is_some());
    if (has_id && has_interactions) || nested_content(item).next().is_some() {
        return ItemKind::Content;
    }

    ItemKind::Unrecognized
}

/// Object entries of every non-empty nested content list on `item`.
pub(crate) fn nested_content(item: &Map<String, Value>) -> impl Iterator<Item = &Map<String, Value>> {
    NESTED_CONTENT_KEYS
        .iter()
        .filter_map(|k| item.get(*k))
        .filter_map(Value::as_array)
        .flatten()
        .filter_map(Value::as_object)
}
