//! Idempotent persistence of normalized posts.

use std::collections::HashSet;
use std::sync::Arc;

use creatorsync_core::NormalizedPost;
use creatorsync_db::PostUpsert;

use crate::error::SyncError;
use crate::store::PostStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub created: usize,
    pub updated: usize,
    /// Blank ids and in-batch duplicates.
    pub skipped: usize,
}

#[derive(Clone)]
pub struct RecordUpserter {
    store: Arc<dyn PostStore>,
}

impl RecordUpserter {
    #[must_use]
    pub fn new(store: Arc<dyn PostStore>) -> Self {
        Self { store }
    }

    /// Creates or updates each post by `(account_id, external_post_id)`.
    /// Re-running with the same batch only updates.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Persistence`] on the first store failure; posts
    /// written before it stay written.
    pub async fn upsert(
        &self,
        account_id: i64,
        posts: &[NormalizedPost],
    ) -> Result<UpsertOutcome, SyncError> {
        let mut outcome = UpsertOutcome::default();
        let mut seen: HashSet<&str> = HashSet::with_capacity(posts.len());

        for post in posts {
            let id = post.external_post_id.trim();
            if id.is_empty() || !seen.insert(id) {
                outcome.skipped += 1;
                continue;
            }
            match self.store.upsert_post(account_id, post).await? {
                PostUpsert::Created => outcome.created += 1,
                PostUpsert::Updated => outcome.updated += 1,
            }
        }

        tracing::debug!(
            account_id,
            created = outcome.created,
            updated = outcome.updated,
            skipped = outcome.skipped,
            "posts upserted"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MemoryStore;

    fn post(id: &str, likes: i64) -> NormalizedPost {
        NormalizedPost {
            likes: Some(likes),
            ..NormalizedPost::new(id)
        }
    }

    #[tokio::test]
    async fn second_run_updates_instead_of_creating() {
        let store = MemoryStore::with_accounts(Vec::new());
        let upserter = RecordUpserter::new(store.clone());
        let batch = vec![post("a", 1), post("b", 2)];

        let first = upserter.upsert(1, &batch).await.unwrap();
        let second = upserter.upsert(1, &batch).await.unwrap();

        assert_eq!((first.created, first.updated), (2, 0));
        assert_eq!((second.created, second.updated), (0, 2));
        assert_eq!(store.post_count(1), 2);
    }

    #[tokio::test]
    async fn blank_ids_and_duplicates_are_skipped() {
        let store = MemoryStore::with_accounts(Vec::new());
        let upserter = RecordUpserter::new(store.clone());
        let batch = vec![post("a", 1), post("  ", 0), post("a", 9), post("b", 2)];

        let outcome = upserter.upsert(3, &batch).await.unwrap();

        assert_eq!(outcome.created, 2);
        assert_eq!(outcome.skipped, 2);
        assert_eq!(store.post_count(3), 2);
    }

    #[tokio::test]
    async fn store_failure_is_a_persistence_error() {
        let store = MemoryStore::with_accounts(Vec::new());
        store.fail_posts_for(4);
        let upserter = RecordUpserter::new(store);

        let err = upserter.upsert(4, &[post("a", 1)]).await.unwrap_err();
        assert!(matches!(err, SyncError::Persistence(_)), "{err:?}");
    }
}
