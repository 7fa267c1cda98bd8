use std::net::SocketAddr;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Development,
    Test,
    Production,
}

impl std::fmt::Display for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Test => write!(f, "test"),
            Environment::Production => write!(f, "production"),
        }
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub env: Environment,
    pub bind_addr: SocketAddr,
    pub log_level: String,
    pub vault_secret: String,
    pub db_max_connections: u32,
    pub db_min_connections: u32,
    pub db_acquire_timeout_secs: u64,
    pub apify_token: Option<String>,
    pub scrape_base_url: String,
    pub photo_actor_id: String,
    pub short_video_actor_id: String,
    pub scrape_max_items: u32,
    pub scrape_timeout_secs: u64,
    pub scrape_max_variant_attempts: usize,
    pub scrape_max_retries: u32,
    pub scrape_retry_backoff_base_secs: u64,
    pub cache_ttl_days: i64,
    pub sync_inter_account_delay_ms: u64,
    pub sync_cron: String,
    pub credential_refresh_cron: String,
    pub credential_horizon_days: i64,
    pub video_oauth_client_id: Option<String>,
    pub video_oauth_client_secret: Option<String>,
    pub video_oauth_token_url: String,
    pub video_api_base_url: String,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("bind_addr", &self.bind_addr)
            .field("log_level", &self.log_level)
            .field("database_url", &"[redacted]")
            .field("vault_secret", &"[redacted]")
            .field("db_max_connections", &self.db_max_connections)
            .field("db_min_connections", &self.db_min_connections)
            .field("db_acquire_timeout_secs", &self.db_acquire_timeout_secs)
            .field(
                "apify_token",
                &self.apify_token.as_ref().map(|_| "[redacted]"),
            )
            .field("scrape_base_url", &self.scrape_base_url)
            .field("photo_actor_id", &self.photo_actor_id)
            .field("short_video_actor_id", &self.short_video_actor_id)
            .field("scrape_max_items", &self.scrape_max_items)
            .field("scrape_timeout_secs", &self.scrape_timeout_secs)
            .field(
                "scrape_max_variant_attempts",
                &self.scrape_max_variant_attempts,
            )
            .field("scrape_max_retries", &self.scrape_max_retries)
            .field(
                "scrape_retry_backoff_base_secs",
                &self.scrape_retry_backoff_base_secs,
            )
            .field("cache_ttl_days", &self.cache_ttl_days)
            .field(
                "sync_inter_account_delay_ms",
                &self.sync_inter_account_delay_ms,
            )
            .field("sync_cron", &self.sync_cron)
            .field("credential_refresh_cron", &self.credential_refresh_cron)
            .field("credential_horizon_days", &self.credential_horizon_days)
            .field("video_oauth_client_id", &self.video_oauth_client_id)
            .field(
                "video_oauth_client_secret",
                &self.video_oauth_client_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("video_oauth_token_url", &self.video_oauth_token_url)
            .field("video_api_base_url", &self.video_api_base_url)
            .finish()
    }
}
