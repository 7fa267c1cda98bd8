pub mod adapter;
pub mod cache;
pub mod classify;
pub mod error;
mod fields;
pub mod metrics;
pub mod normalize;
pub mod provider;
mod rate_limit;
pub mod variants;

pub use adapter::{ProfileScraper, ScrapeSettings};
pub use cache::{normalize_handle, ScrapeCache};
pub use classify::{classify, ItemKind};
pub use error::ScraperError;
pub use fields::{parse_count, parse_timestamp};
pub use normalize::normalize_items;
pub use provider::{ApifyConfig, ApifyProvider, ScrapeProvider};
pub use variants::InputVariant;
