//! Parsing of user-supplied catalog links.

use url::Url;

const WATCH_BASE: &str = "https://www.youtube.com/watch";

/// Canonical watch-page URL for a catalog video id.
#[must_use]
pub fn watch_url(external_id: &str) -> String {
    format!("{WATCH_BASE}?v={external_id}")
}

/// Extracts the playlist id from the `list=` query parameter.
#[must_use]
pub fn extract_playlist_id(playlist_url: &str) -> Option<String> {
    let url = parse_lenient(playlist_url)?;
    query_value(&url, "list")
}

/// Extracts a video id from either `...watch?v=ID` or the short `youtu.be/ID` form.
#[must_use]
pub fn extract_video_id(video_url: &str) -> Option<String> {
    let url = parse_lenient(video_url)?;
    if let Some(id) = query_value(&url, "v") {
        return Some(id);
    }

    let host = url.host_str()?.trim_start_matches("www.");
    if host != "youtu.be" {
        return None;
    }
    url.path_segments()?
        .filter(|segment| !segment.is_empty())
        .last()
        .map(str::to_owned)
}

fn parse_lenient(raw: &str) -> Option<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    Url::parse(raw)
        .or_else(|_| Url::parse(&format!("https://{raw}")))
        .ok()
}

fn query_value(url: &Url, key: &str) -> Option<String> {
    url.query_pairs()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.trim().to_owned())
        .filter(|v| !v.is_empty())
}
