use std::collections::HashMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;
use study_core::duration::parse_iso_duration;
use study_core::links::{extract_playlist_id, extract_video_id};
use study_core::model::PlaylistItem;
use tracing::{debug, info, warn};

use super::transport::{CatalogTransport, HttpCatalogTransport};
use super::wire::{ApiErrorBody, PlaylistItemsPage, VideosPage};
use crate::error::FetchError;

/// Largest page the catalog API hands out.
pub const PAGE_SIZE: u32 = 50;

const UNKNOWN_TITLE: &str = "Unknown";
const HIDDEN_TITLES: [&str; 2] = ["Private video", "Deleted video"];

/// Turns playlist and video links into `PlaylistItem`s via the catalog API.
#[derive(Clone)]
pub struct PlaylistFetcher {
    transport: Arc<dyn CatalogTransport>,
}

impl PlaylistFetcher {
    #[must_use]
    pub fn new(transport: Arc<dyn CatalogTransport>) -> Self {
        Self { transport }
    }

    #[must_use]
    pub fn http(base_url: impl Into<String>) -> Self {
        Self::new(Arc::new(HttpCatalogTransport::new(base_url)))
    }

    /// Fetch every playable entry of a playlist, with durations, in playlist order.
    ///
    /// # Errors
    ///
    /// Any failure aborts the whole fetch; no partial list is returned.
    pub async fn fetch_playlist(
        &self,
        playlist_url: &str,
        api_key: &str,
    ) -> Result<Vec<PlaylistItem>, FetchError> {
        let playlist_id = extract_playlist_id(playlist_url)
            .ok_or_else(|| FetchError::InvalidUrl(playlist_url.to_owned()))?;
        let key = require_key(api_key)?;

        let mut items = Vec::new();
        let mut page_token: Option<String> = None;
        loop {
            let mut params = vec![
                ("part", "snippet".to_owned()),
                ("maxResults", PAGE_SIZE.to_string()),
                ("playlistId", playlist_id.clone()),
                ("key", key.clone()),
            ];
            if let Some(token) = &page_token {
                params.push(("pageToken", token.clone()));
            }
            let page: PlaylistItemsPage = self.call("playlistItems", &params).await?;
            if page.items.is_empty() {
                break;
            }

            let entries: Vec<(String, String)> = page
                .items
                .into_iter()
                .filter_map(|entry| {
                    let snippet = entry.snippet?;
                    let video_id = snippet.resource_id?.video_id?;
                    let title = snippet.title.unwrap_or_else(|| UNKNOWN_TITLE.to_owned());
                    Some((video_id, title))
                })
                .filter(|(_, title)| !HIDDEN_TITLES.contains(&title.as_str()))
                .collect();

            if !entries.is_empty() {
                let ids: Vec<&str> = entries.iter().map(|(id, _)| id.as_str()).collect();
                let durations = self.durations(&ids, &key).await?;
                items.extend(entries.into_iter().map(|(id, title)| {
                    let seconds = durations.get(&id).copied().unwrap_or(0);
                    PlaylistItem::new(title, id, seconds)
                }));
            }
            debug!(playlist = %playlist_id, fetched = items.len(), "catalog page processed");

            page_token = page.next_page_token.filter(|token| !token.is_empty());
            if page_token.is_none() {
                break;
            }
        }

        info!(playlist = %playlist_id, videos = items.len(), "playlist fetched");
        Ok(items)
    }

    /// Fetch one video by its watch or short link.
    ///
    /// # Errors
    ///
    /// `FetchError::NotFound` when the catalog returns no entry for the id.
    pub async fn fetch_single_video(
        &self,
        video_url: &str,
        api_key: &str,
    ) -> Result<PlaylistItem, FetchError> {
        let video_id = extract_video_id(video_url)
            .ok_or_else(|| FetchError::InvalidUrl(video_url.to_owned()))?;
        let key = require_key(api_key)?;

        let params = [
            ("part", "snippet,contentDetails".to_owned()),
            ("id", video_id.clone()),
            ("key", key),
        ];
        let page: VideosPage = self.call("videos", &params).await?;
        let entry = page.items.into_iter().next().ok_or(FetchError::NotFound)?;

        let title = entry
            .snippet
            .and_then(|s| s.title)
            .unwrap_or_else(|| UNKNOWN_TITLE.to_owned());
        let seconds = entry
            .content_details
            .map_or(0, |details| parse_iso_duration(&details.duration));
        debug!(video = %video_id, seconds, "video fetched");
        Ok(PlaylistItem::new(title, entry.id, seconds))
    }

    async fn durations(&self, ids: &[&str], key: &str) -> Result<HashMap<String, u32>, FetchError> {
        let params = [
            ("part", "contentDetails".to_owned()),
            ("id", ids.join(",")),
            ("key", key.to_owned()),
        ];
        let page: VideosPage = self.call("videos", &params).await?;
        Ok(page
            .items
            .into_iter()
            .map(|entry| {
                let seconds = entry
                    .content_details
                    .map_or(0, |details| parse_iso_duration(&details.duration));
                (entry.id, seconds)
            })
            .collect())
    }

    async fn call<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        params: &[(&str, String)],
    ) -> Result<T, FetchError> {
        let mut body = self.transport.get_json(endpoint, params).await?;
        if let Some(error) = body.get_mut("error").map(Value::take) {
            let err = classify(error);
            warn!(endpoint, error = %err, "catalog API returned an error");
            return Err(err);
        }
        serde_json::from_value(body)
            .map_err(|e| FetchError::Network(format!("unexpected {endpoint} response: {e}")))
    }
}

fn require_key(api_key: &str) -> Result<String, FetchError> {
    let key = api_key.trim();
    if key.is_empty() {
        return Err(FetchError::MissingApiKey);
    }
    Ok(key.to_owned())
}

fn classify(error: Value) -> FetchError {
    let body: ApiErrorBody = serde_json::from_value(error).unwrap_or_default();
    let reason = body.errors.first().map(|detail| detail.reason.as_str());
    match reason {
        Some("keyInvalid") => FetchError::Auth,
        Some("quotaExceeded") => FetchError::QuotaExceeded,
        _ => FetchError::Api(body.message),
    }
}
