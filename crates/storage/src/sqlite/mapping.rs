use sqlx::Row;
use sqlx::sqlite::SqliteRow;
use study_core::model::{
    ChunkId, DailyGoal, DailyLog, Exam, ExamId, Streak, Subject, SubjectId, UserId, UserProfile,
    Video, VideoChunk, VideoId,
};

use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

fn i64_to_u64(field: &'static str, v: i64) -> Result<u64, StorageError> {
    u64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} sign overflow")))
}

pub(crate) fn u32_from_i64(field: &'static str, v: i64) -> Result<u32, StorageError> {
    u32::try_from(v).map_err(|_| StorageError::Serialization(format!("invalid {field}: {v}")))
}

pub(crate) fn id_to_i64(field: &'static str, v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization(format!("{field} overflow")))
}

pub(crate) fn seconds_to_i64(v: u64) -> Result<i64, StorageError> {
    i64::try_from(v).map_err(|_| StorageError::Serialization("seconds overflow".into()))
}

fn get_u64(row: &SqliteRow, field: &'static str) -> Result<u64, StorageError> {
    i64_to_u64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn get_u32(row: &SqliteRow, field: &'static str) -> Result<u32, StorageError> {
    u32_from_i64(field, row.try_get::<i64, _>(field).map_err(ser)?)
}

fn get_flag(row: &SqliteRow, field: &'static str) -> Result<bool, StorageError> {
    Ok(row.try_get::<i64, _>(field).map_err(ser)? != 0)
}

pub(crate) fn map_exam_row(row: &SqliteRow) -> Result<Exam, StorageError> {
    Exam::new(
        ExamId::new(get_u64(row, "id")?),
        UserId::new(get_u64(row, "user_id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        row.try_get::<String, _>("description").map_err(ser)?,
        row.try_get("created_at").map_err(ser)?,
    )
    .map_err(ser)
}

pub(crate) fn map_subject_row(row: &SqliteRow) -> Result<Subject, StorageError> {
    Subject::new(
        SubjectId::new(get_u64(row, "id")?),
        ExamId::new(get_u64(row, "exam_id")?),
        row.try_get::<String, _>("name").map_err(ser)?,
        get_u32(row, "daily_goal_minutes")?,
    )
    .map_err(ser)
}

pub(crate) fn map_video_row(row: &SqliteRow) -> Result<Video, StorageError> {
    Ok(Video {
        id: VideoId::new(get_u64(row, "id")?),
        subject_id: SubjectId::new(get_u64(row, "subject_id")?),
        title: row.try_get("title").map_err(ser)?,
        external_id: row.try_get("external_id").map_err(ser)?,
        url: row.try_get("url").map_err(ser)?,
        duration_seconds: get_u32(row, "duration_seconds")?,
        is_watched: get_flag(row, "is_watched")?,
        position: get_u32(row, "position")?,
    })
}

pub(crate) fn map_chunk_row(row: &SqliteRow) -> Result<VideoChunk, StorageError> {
    VideoChunk::new(
        ChunkId::new(get_u64(row, "id")?),
        VideoId::new(get_u64(row, "video_id")?),
        get_u32(row, "chunk_index")?,
        get_u32(row, "start_seconds")?,
        get_u32(row, "end_seconds")?,
        row.try_get::<String, _>("title").map_err(ser)?,
        get_flag(row, "is_watched")?,
    )
    .map_err(ser)
}

pub(crate) fn map_daily_log_row(row: &SqliteRow) -> Result<DailyLog, StorageError> {
    Ok(DailyLog {
        user_id: UserId::new(get_u64(row, "user_id")?),
        subject_id: SubjectId::new(get_u64(row, "subject_id")?),
        date: row.try_get("date").map_err(ser)?,
        seconds_watched: get_u64(row, "seconds_watched")?,
    })
}

pub(crate) fn map_goal_row(row: &SqliteRow) -> Result<DailyGoal, StorageError> {
    Ok(DailyGoal {
        user_id: UserId::new(get_u64(row, "user_id")?),
        date: row.try_get("date").map_err(ser)?,
        goal_hours: row.try_get("goal_hours").map_err(ser)?,
        completed_seconds: get_u64(row, "completed_seconds")?,
        achieved: get_flag(row, "achieved")?,
    })
}

pub(crate) fn map_streak_row(row: &SqliteRow) -> Result<Streak, StorageError> {
    Ok(Streak {
        current_streak: get_u32(row, "current_streak")?,
        best_streak: get_u32(row, "best_streak")?,
        last_achieved_on: row.try_get("last_achieved_on").map_err(ser)?,
    })
}

pub(crate) fn map_profile_row(row: &SqliteRow) -> Result<UserProfile, StorageError> {
    Ok(UserProfile {
        user_id: UserId::new(get_u64(row, "user_id")?),
        catalog_api_key: row.try_get("catalog_api_key").map_err(ser)?,
        default_goal_hours: row.try_get("default_goal_hours").map_err(ser)?,
    })
}
