pub mod accounts;
pub mod app_config;
pub mod config;
pub mod content;
pub mod platform;

pub use accounts::{
    AccountMetadata, AccountMetrics, EncryptedCredential, NewSocialAccount, RecentPostSummary,
    SocialAccount,
};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use content::{round2, MediaDescriptor, NormalizedPost, ScrapeResult, ScrapedProfile};
pub use platform::Platform;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("unknown platform: {0}")]
    UnknownPlatform(String),
}
