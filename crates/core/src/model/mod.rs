mod exam;
mod ids;
mod tracking;
mod video;

use thiserror::Error;

pub use exam::{Exam, Subject};
pub use ids::{ChunkId, ExamId, ParseIdError, SubjectId, UserId, VideoId};
pub use tracking::{DailyGoal, DailyLog, Streak, UserProfile};
pub use video::{PlaylistItem, TrackedVideo, Video, VideoChunk, Watchable, generated_external_id};

/// Validation failures when building catalog entities.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ModelError {
    #[error("exam name cannot be empty")]
    EmptyExamName,

    #[error("subject name cannot be empty")]
    EmptySubjectName,

    #[error("video title cannot be empty")]
    EmptyVideoTitle,

    #[error("chunk range {start}..{end} is invalid")]
    InvalidChunkRange { start: u32, end: u32 },
}

/// Trims a display name, failing with `empty` when nothing is left.
///
/// # Errors
///
/// Returns `empty` if `raw` is blank.
pub fn validate_name(raw: &str, empty: ModelError) -> Result<String, ModelError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(empty);
    }
    Ok(name.to_owned())
}
