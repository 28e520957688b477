use serde::{Deserialize, Serialize};

use crate::links::watch_url;
use crate::model::ModelError;
use crate::model::ids::{ChunkId, SubjectId, VideoId};

//
// ─── PLAYLIST ITEM ─────────────────────────────────────────────────────────────
//

/// A video as returned by the catalog API, before it is stored under a subject.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistItem {
    pub title: String,
    pub external_id: String,
    pub url: String,
    pub duration_seconds: u32,
}

impl PlaylistItem {
    /// Builds an item whose URL is the canonical watch page for `external_id`.
    #[must_use]
    pub fn new(title: impl Into<String>, external_id: impl Into<String>, duration_seconds: u32) -> Self {
        let external_id = external_id.into();
        Self {
            title: title.into(),
            url: watch_url(&external_id),
            external_id,
            duration_seconds,
        }
    }
}

/// Placeholder external id for rows imported without one (`csv-` + 8 hex chars).
#[must_use]
pub fn generated_external_id() -> String {
    let hex = uuid::Uuid::new_v4().simple().to_string();
    format!("csv-{}", &hex[..8])
}

//
// ─── WATCHABLE UNITS ───────────────────────────────────────────────────────────
//

/// Anything that can be marked watched and contributes time to progress.
pub trait Watchable {
    fn duration_seconds(&self) -> u32;
    fn is_watched(&self) -> bool;
}

/// A stored video inside a subject, ordered by `position`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Video {
    pub id: VideoId,
    pub subject_id: SubjectId,
    pub title: String,
    pub external_id: String,
    pub url: String,
    pub duration_seconds: u32,
    pub is_watched: bool,
    pub position: u32,
}

impl Watchable for Video {
    fn duration_seconds(&self) -> u32 {
        self.duration_seconds
    }

    fn is_watched(&self) -> bool {
        self.is_watched
    }
}

/// A contiguous `[start, end)` slice of a video watched on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoChunk {
    id: ChunkId,
    video_id: VideoId,
    index: u32,
    start_seconds: u32,
    end_seconds: u32,
    title: String,
    is_watched: bool,
}

impl VideoChunk {
    /// # Errors
    ///
    /// Returns `ModelError::InvalidChunkRange` unless `start < end`.
    pub fn new(
        id: ChunkId,
        video_id: VideoId,
        index: u32,
        start_seconds: u32,
        end_seconds: u32,
        title: impl Into<String>,
        is_watched: bool,
    ) -> Result<Self, ModelError> {
        if start_seconds >= end_seconds {
            return Err(ModelError::InvalidChunkRange {
                start: start_seconds,
                end: end_seconds,
            });
        }
        Ok(Self {
            id,
            video_id,
            index,
            start_seconds,
            end_seconds,
            title: title.into(),
            is_watched,
        })
    }

    #[must_use]
    pub fn id(&self) -> ChunkId {
        self.id
    }

    #[must_use]
    pub fn video_id(&self) -> VideoId {
        self.video_id
    }

    /// 1-based position inside the parent video.
    #[must_use]
    pub fn index(&self) -> u32 {
        self.index
    }

    #[must_use]
    pub fn start_seconds(&self) -> u32 {
        self.start_seconds
    }

    #[must_use]
    pub fn end_seconds(&self) -> u32 {
        self.end_seconds
    }

    #[must_use]
    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn set_watched(&mut self, watched: bool) {
        self.is_watched = watched;
    }
}

impl Watchable for VideoChunk {
    fn duration_seconds(&self) -> u32 {
        self.end_seconds - self.start_seconds
    }

    fn is_watched(&self) -> bool {
        self.is_watched
    }
}

/// A video together with its chunks, the unit progress is computed over.
///
/// When `chunks` is non-empty the parent's own watched flag is ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedVideo {
    pub video: Video,
    pub chunks: Vec<VideoChunk>,
}

impl TrackedVideo {
    #[must_use]
    pub fn whole(video: Video) -> Self {
        Self {
            video,
            chunks: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_chunked(&self) -> bool {
        !self.chunks.is_empty()
    }

    /// The units that count toward progress: the chunks if any, otherwise the video.
    pub fn units(&self) -> Box<dyn Iterator<Item = &dyn Watchable> + '_> {
        if self.is_chunked() {
            Box::new(self.chunks.iter().map(|c| c as &dyn Watchable))
        } else {
            Box::new(std::iter::once(&self.video as &dyn Watchable))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn playlist_item_builds_watch_url() {
        let item = PlaylistItem::new("Intro", "abc123", 60);
        assert_eq!(item.url, "https://www.youtube.com/watch?v=abc123");
    }

    #[test]
    fn generated_id_has_prefix_and_eight_hex_chars() {
        let id = generated_external_id();
        assert!(id.starts_with("csv-"));
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn chunk_requires_non_empty_range() {
        let err = VideoChunk::new(ChunkId::new(1), VideoId::new(1), 1, 10, 10, "x", false)
            .unwrap_err();
        assert_eq!(err, ModelError::InvalidChunkRange { start: 10, end: 10 });
    }

    #[test]
    fn chunked_video_ignores_parent_flag() {
        let video = Video {
            id: VideoId::new(1),
            subject_id: SubjectId::new(1),
            title: "Lecture".into(),
            external_id: "x".into(),
            url: watch_url("x"),
            duration_seconds: 100,
            is_watched: true,
            position: 0,
        };
        let chunk = VideoChunk::new(ChunkId::new(1), video.id, 1, 0, 100, "Part 1", false).unwrap();
        let tracked = TrackedVideo {
            video,
            chunks: vec![chunk],
        };
        let watched: Vec<bool> = tracked.units().map(Watchable::is_watched).collect();
        assert_eq!(watched, vec![false]);
    }
}
