//! Logs every [`SyncEvent`] so operators see deactivations and run outcomes
//! without a dedicated notification backend.

use creatorsync_sync::{EventBus, SyncEvent};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub fn spawn_event_log(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => log_event(&event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event log fell behind, events dropped");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn log_event(event: &SyncEvent) {
    match event {
        SyncEvent::SyncCompleted {
            trigger,
            success,
            failed,
            stopped,
        } => tracing::info!(%trigger, success, failed, stopped, "event: sync completed"),
        SyncEvent::CredentialsRefreshed {
            succeeded,
            failed,
            deactivated,
        } => tracing::info!(succeeded, failed, deactivated, "event: credentials refreshed"),
        SyncEvent::AccountDeactivated {
            account_id,
            owner_id,
            platform,
            reason,
        } => tracing::warn!(
            account_id,
            %owner_id,
            %platform,
            reason = %reason,
            "event: account deactivated, owner must reconnect"
        ),
    }
}
