use crate::app_config::{AppConfig, Environment};
use crate::ConfigError;

/// Load application configuration from environment variables.
///
/// Calls `dotenvy::dotenv().ok()` to load `.env` files before reading env vars.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config() -> Result<AppConfig, ConfigError> {
    dotenvy::dotenv().ok();
    load_app_config_from_env()
}

/// Load application configuration from environment variables already in the process.
///
/// Unlike [`load_app_config`], this does NOT load `.env` files.
///
/// # Errors
///
/// Returns `ConfigError` if required env vars are missing or values are invalid.
pub fn load_app_config_from_env() -> Result<AppConfig, ConfigError> {
    build_app_config(|key| std::env::var(key))
}

/// Build application configuration using the provided env-var lookup function.
///
/// Decoupled from the real environment so it can be tested with a plain
/// `HashMap` lookup.
fn build_app_config<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Result<String, std::env::VarError>,
{
    use std::net::SocketAddr;

    let require = |var: &str| -> Result<String, ConfigError> {
        lookup(var)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar(var.to_string()))
    };

    let or_default = |var: &str, default: &str| -> String {
        lookup(var).unwrap_or_else(|_| default.to_string())
    };

    let parse_num = |var: &str, default: &str| -> Result<u64, ConfigError> {
        let raw = or_default(var, default);
        raw.parse::<u64>().map_err(|e| ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: e.to_string(),
        })
    };

    let narrow = |var: &str, value: u64| -> ConfigError {
        ConfigError::InvalidEnvVar {
            var: var.to_string(),
            reason: format!("{value} is out of range"),
        }
    };

    let parse_u32 = |var: &str, default: &str| -> Result<u32, ConfigError> {
        let value = parse_num(var, default)?;
        u32::try_from(value).map_err(|_| narrow(var, value))
    };

    let parse_i64 = |var: &str, default: &str| -> Result<i64, ConfigError> {
        let value = parse_num(var, default)?;
        i64::try_from(value).map_err(|_| narrow(var, value))
    };

    let parse_usize = |var: &str, default: &str| -> Result<usize, ConfigError> {
        let value = parse_num(var, default)?;
        usize::try_from(value).map_err(|_| narrow(var, value))
    };

    let database_url = require("DATABASE_URL")?;
    let vault_secret = require("CREATORSYNC_VAULT_SECRET")?;

    let env = parse_environment(&or_default("CREATORSYNC_ENV", "development"));

    let raw_bind = or_default("CREATORSYNC_BIND_ADDR", "0.0.0.0:3000");
    let bind_addr = raw_bind
        .parse::<SocketAddr>()
        .map_err(|e| ConfigError::InvalidEnvVar {
            var: "CREATORSYNC_BIND_ADDR".to_string(),
            reason: e.to_string(),
        })?;
    let log_level = or_default("CREATORSYNC_LOG_LEVEL", "info");

    let db_max_connections = parse_u32("CREATORSYNC_DB_MAX_CONNECTIONS", "10")?;
    let db_min_connections = parse_u32("CREATORSYNC_DB_MIN_CONNECTIONS", "1")?;
    let db_acquire_timeout_secs = parse_num("CREATORSYNC_DB_ACQUIRE_TIMEOUT_SECS", "10")?;

    let apify_token = lookup("APIFY_TOKEN").ok().filter(|v| !v.trim().is_empty());
    let scrape_base_url = or_default("CREATORSYNC_SCRAPE_BASE_URL", "https://api.apify.com/v2");
    let photo_actor_id = or_default(
        "CREATORSYNC_PHOTO_ACTOR_ID",
        "apify~instagram-profile-scraper",
    );
    let short_video_actor_id =
        or_default("CREATORSYNC_SHORT_VIDEO_ACTOR_ID", "clockworks~tiktok-scraper");
    let scrape_max_items = parse_u32("CREATORSYNC_SCRAPE_MAX_ITEMS", "30")?;
    let scrape_timeout_secs = parse_num("CREATORSYNC_SCRAPE_TIMEOUT_SECS", "120")?;
    let scrape_max_variant_attempts =
        parse_usize("CREATORSYNC_SCRAPE_MAX_VARIANT_ATTEMPTS", "4")?;
    let scrape_max_retries = parse_u32("CREATORSYNC_SCRAPE_MAX_RETRIES", "2")?;
    let scrape_retry_backoff_base_secs =
        parse_num("CREATORSYNC_SCRAPE_RETRY_BACKOFF_BASE_SECS", "5")?;

    let cache_ttl_days = parse_i64("CREATORSYNC_CACHE_TTL_DAYS", "7")?;
    let sync_inter_account_delay_ms =
        parse_num("CREATORSYNC_SYNC_INTER_ACCOUNT_DELAY_MS", "2000")?;
    let sync_cron = or_default("CREATORSYNC_SYNC_CRON", "0 0 */6 * * *");
    let credential_refresh_cron =
        or_default("CREATORSYNC_CREDENTIAL_REFRESH_CRON", "0 30 3 * * *");
    let credential_horizon_days = parse_i64("CREATORSYNC_CREDENTIAL_HORIZON_DAYS", "7")?;

    let video_oauth_client_id = lookup("VIDEO_OAUTH_CLIENT_ID").ok();
    let video_oauth_client_secret = lookup("VIDEO_OAUTH_CLIENT_SECRET").ok();
    let video_oauth_token_url = or_default(
        "VIDEO_OAUTH_TOKEN_URL",
        "https://oauth2.googleapis.com/token",
    );
    let video_api_base_url = or_default(
        "VIDEO_API_BASE_URL",
        "https://www.googleapis.com/youtube/v3",
    );

    Ok(AppConfig {
        database_url,
        env,
        bind_addr,
        log_level,
        vault_secret,
        db_max_connections,
        db_min_connections,
        db_acquire_timeout_secs,
        apify_token,
        scrape_base_url,
        photo_actor_id,
        short_video_actor_id,
        scrape_max_items,
        scrape_timeout_secs,
        scrape_max_variant_attempts,
        scrape_max_retries,
        scrape_retry_backoff_base_secs,
        cache_ttl_days,
        sync_inter_account_delay_ms,
        sync_cron,
        credential_refresh_cron,
        credential_horizon_days,
        video_oauth_client_id,
        video_oauth_client_secret,
        video_oauth_token_url,
        video_api_base_url,
    })
}

/// Parse a string into an `Environment` variant.
///
/// Unrecognized values default to `Environment::Development`.
fn parse_environment(s: &str) -> Environment {
    match s {
        "production" => Environment::Production,
        "test" => Environment::Test,
        _ => Environment::Development,
    }
}
