//! Account sync orchestration: scheduled data refresh, credential
//! lifecycle, account linking and the service surface built on them.

pub mod audit;
pub mod components;
pub mod credentials;
pub mod error;
pub mod events;
mod flight;
pub mod gate;
pub mod linking;
pub mod oauth;
pub mod report;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod upsert;
pub mod video_network;

#[cfg(test)]
mod testing;

pub use audit::{fail_run_best_effort, run_refresh_recorded, run_sync_recorded};
pub use components::Components;
pub use credentials::CredentialLifecycleManager;
pub use error::SyncError;
pub use events::{EventBus, SyncEvent};
pub use gate::{next_permit, IntervalGate};
pub use linking::{AccountLinker, AllowAllOwners, OwnerDirectory};
pub use oauth::{OAuthError, OAuthPlatform, OAuthPlatforms, TokenGrant};
pub use report::{AccountFailure, FailureKind, RefreshReport, SyncReport, SyncTrigger};
pub use scheduler::{SchedulerSettings, SyncDeps, SyncScheduler};
pub use service::AccountService;
pub use store::{AccountStore, PgStore, PostStore};
pub use upsert::{RecordUpserter, UpsertOutcome};
pub use video_network::{VideoNetworkClient, VideoNetworkConfig};
