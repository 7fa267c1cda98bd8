use creatorsync_core::Platform;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("no {platform} data found for \"{handle}\" after trying every input variant")]
    UpstreamNotFound { platform: Platform, handle: String },

    #[error("scrape run {run_id} did not finish within {waited_secs}s")]
    UpstreamTimeout { run_id: String, waited_secs: u64 },

    #[error("rate limited by scrape provider (retry after {retry_after_secs}s)")]
    RateLimited { retry_after_secs: u64 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("scrape provider returned HTTP {status}: {message}")]
    Api { status: u16, message: String },

    #[error("scrape run {run_id} ended with status {status}")]
    RunFailed { run_id: String, status: String },

    #[error("JSON deserialization error for {context}: {source}")]
    Deserialize {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("no scrape actor configured for {0}")]
    UnsupportedPlatform(Platform),
}
