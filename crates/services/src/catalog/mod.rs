//! Client for the external video catalog (playlist and video metadata).

mod fetcher;
mod transport;
mod wire;

use std::env;

pub use fetcher::{PAGE_SIZE, PlaylistFetcher};
pub use transport::{CatalogTransport, HttpCatalogTransport, RecordedRequest, ScriptedTransport};

/// Value shipped in sample config files; treated as "no key configured".
pub const PLACEHOLDER_API_KEY: &str = "YOUR_API_KEY_HERE";

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub base_url: String,
    /// Deployment-wide key; takes precedence over keys stored on user profiles.
    pub api_key: Option<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: None,
        }
    }
}

impl CatalogConfig {
    #[must_use]
    pub fn from_env() -> Self {
        let base_url =
            env::var("STUDY_CATALOG_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        let api_key = env::var("STUDY_CATALOG_API_KEY")
            .ok()
            .and_then(|key| usable_key(&key));
        Self { base_url, api_key }
    }
}

/// Trims a key and discards blanks and the sample placeholder.
#[must_use]
pub fn usable_key(raw: &str) -> Option<String> {
    let key = raw.trim();
    if key.is_empty() || key == PLACEHOLDER_API_KEY {
        None
    } else {
        Some(key.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_and_blank_keys_are_unusable() {
        assert_eq!(usable_key(PLACEHOLDER_API_KEY), None);
        assert_eq!(usable_key("   "), None);
        assert_eq!(usable_key(" abc ").as_deref(), Some("abc"));
    }
}
