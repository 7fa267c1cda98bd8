//! Input shapes accepted by profile scrape actors.
//!
//! Actors disagree on how a target profile is named in the run input, and
//! they change it between versions. The adapter tries these shapes in order
//! until one yields items.

use creatorsync_core::Platform;
use serde_json::{json, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputVariant {
    Handles,
    Usernames,
    Profiles,
    StartUrls,
}

impl InputVariant {
    /// Fallback order.
    pub const ORDER: [InputVariant; 4] = [
        InputVariant::Handles,
        InputVariant::Usernames,
        InputVariant::Profiles,
        InputVariant::StartUrls,
    ];

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            InputVariant::Handles => "handles",
            InputVariant::Usernames => "usernames",
            InputVariant::Profiles => "profiles",
            InputVariant::StartUrls => "startUrls",
        }
    }

    /// Builds the actor run input for `handle`, capped at `max_items`
    /// results, with profile and post statistics requested.
    #[must_use]
    pub fn build_input(self, platform: Platform, handle: &str, max_items: u32) -> Value {
        let handle = handle.trim().trim_start_matches('@');
        let target = match self {
            InputVariant::Handles | InputVariant::Usernames => json!([handle]),
            InputVariant::Profiles => json!([platform.profile_url(handle)]),
            InputVariant::StartUrls => json!([{ "url": platform.profile_url(handle) }]),
        };

        let mut input = json!({
            "resultsLimit": max_items,
            "maxItems": max_items,
            "resultsPerPage": max_items,
            "includeProfileStats": true,
            "includePostStats": true,
        });
        input[self.name()] = target;
        input
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_is_fixed() {
        let names: Vec<&str> = InputVariant::ORDER.iter().map(|v| v.name()).collect();
        assert_eq!(names, ["handles", "usernames", "profiles", "startUrls"]);
    }

    #[test]
    fn handle_variants_carry_bare_handle_and_caps() {
        let input = InputVariant::Usernames.build_input(Platform::PhotoNetwork, "@chef.ana", 30);
        assert_eq!(input["usernames"], json!(["chef.ana"]));
        assert_eq!(input["resultsLimit"], 30);
        assert_eq!(input["maxItems"], 30);
        assert_eq!(input["includeProfileStats"], true);
        assert!(input.get("handles").is_none());
    }

    #[test]
    fn url_variants_use_profile_urls() {
        let profiles = InputVariant::Profiles.build_input(Platform::ShortVideoNetwork, "dancer", 10);
        assert_eq!(profiles["profiles"], json!(["https://www.tiktok.com/@dancer"]));

        let start = InputVariant::StartUrls.build_input(Platform::PhotoNetwork, "chef.ana", 10);
        assert_eq!(
            start["startUrls"],
            json!([{"url": "https://www.instagram.com/chef.ana/"}])
        );
    }
}
