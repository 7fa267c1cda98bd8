//! In-process notifications for other subsystems.
//!
//! Delivery is best effort: a publish with no live subscribers is dropped.

use creatorsync_core::Platform;
use serde::Serialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::report::SyncTrigger;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum SyncEvent {
    SyncCompleted {
        trigger: SyncTrigger,
        success: usize,
        failed: usize,
        stopped: bool,
    },
    CredentialsRefreshed {
        succeeded: usize,
        failed: usize,
        deactivated: usize,
    },
    AccountDeactivated {
        account_id: i64,
        owner_id: Uuid,
        platform: Platform,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<SyncEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl EventBus {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: SyncEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("sync event dropped, no subscribers");
        }
    }
}
