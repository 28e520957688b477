use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use study_core::chunking::ChunkPlan;
use study_core::model::{
    ChunkId, DailyGoal, DailyLog, Exam, ExamId, PlaylistItem, Streak, Subject, SubjectId,
    UserId, UserProfile, Video, VideoChunk, VideoId, Watchable,
};
use study_core::progress::{
    apply_goal_hours, apply_goal_progress, apply_watch_toggle, refresh_streak, update_streak,
};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── RECORDS ───────────────────────────────────────────────────────────────────
//

/// Insert shape for an exam; the adapter assigns the ID.
#[derive(Debug, Clone)]
pub struct NewExamRecord {
    pub user_id: UserId,
    pub name: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewSubjectRecord {
    pub exam_id: ExamId,
    pub name: String,
    pub daily_goal_minutes: u32,
}

/// Insert shape for a video appended to a subject at `position`.
#[derive(Debug, Clone)]
pub struct NewVideoRecord {
    pub subject_id: SubjectId,
    pub title: String,
    pub external_id: String,
    pub url: String,
    pub duration_seconds: u32,
    pub position: u32,
}

impl NewVideoRecord {
    #[must_use]
    pub fn from_item(subject_id: SubjectId, item: &PlaylistItem, position: u32) -> Self {
        Self {
            subject_id,
            title: item.title.clone(),
            external_id: item.external_id.clone(),
            url: item.url.clone(),
            duration_seconds: item.duration_seconds,
            position,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewChunkRecord {
    pub index: u32,
    pub start_seconds: u32,
    pub end_seconds: u32,
    pub title: String,
    pub is_watched: bool,
}

impl NewChunkRecord {
    #[must_use]
    pub fn watched(mut self, is_watched: bool) -> Self {
        self.is_watched = is_watched;
        self
    }
}

impl From<ChunkPlan> for NewChunkRecord {
    fn from(plan: ChunkPlan) -> Self {
        Self {
            index: plan.index,
            start_seconds: plan.start_seconds,
            end_seconds: plan.end_seconds,
            title: plan.title,
            is_watched: false,
        }
    }
}

/// A goal after an atomic change, and whether that change met it.
#[derive(Debug, Clone)]
pub struct GoalUpdate {
    pub goal: DailyGoal,
    /// True for exactly one write per goal: the one that took it from unmet to met.
    pub crossed: bool,
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract for exams and their subjects.
#[async_trait]
pub trait ExamRepository: Send + Sync {
    /// Insert a new exam and return its assigned ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the exam cannot be stored.
    async fn insert_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError>;

    /// Fetch an exam by ID, `Ok(None)` when missing.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError>;

    /// List a user's exams ordered by ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn list_exams(&self, user_id: UserId) -> Result<Vec<Exam>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the exam does not exist.
    async fn insert_subject(&self, subject: NewSubjectRecord) -> Result<SubjectId, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn list_subjects(&self, exam_id: ExamId) -> Result<Vec<Subject>, StorageError>;

    /// Persist subject edits (name, daily goal minutes).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the subject cannot be stored.
    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError>;

    /// Delete an exam with its subjects, their videos, chunks and daily logs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the exam does not exist.
    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError>;

    /// Delete a subject with its videos, chunks and daily logs.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist.
    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError>;
}

/// Repository contract for videos and their chunks.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert videos in the given order and return their IDs in the same order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any insert fails; no partial batch is kept.
    async fn insert_videos(&self, videos: &[NewVideoRecord]) -> Result<Vec<VideoId>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, StorageError>;

    /// List a subject's videos ordered by position, then ID.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn list_videos(&self, subject_id: SubjectId) -> Result<Vec<Video>, StorageError>;

    /// Highest position used in a subject, `None` for an empty subject.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn max_position(&self, subject_id: SubjectId) -> Result<Option<u32>, StorageError>;

    /// Set a video's watched flag. Returns `false` when the flag already had that value,
    /// so concurrent identical toggles report exactly one change.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the video does not exist.
    async fn set_video_watched(&self, id: VideoId, watched: bool) -> Result<bool, StorageError>;

    /// Remove every video of a subject (its playlist) together with their chunks.
    /// Returns how many videos were removed.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend failures.
    async fn delete_subject_videos(&self, subject_id: SubjectId) -> Result<u64, StorageError>;

    /// Replace all chunks of a video with the given plan.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the video does not exist.
    async fn replace_chunks(
        &self,
        video_id: VideoId,
        chunks: &[NewChunkRecord],
    ) -> Result<Vec<VideoChunk>, StorageError>;

    /// List a video's chunks ordered by index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn list_chunks(&self, video_id: VideoId) -> Result<Vec<VideoChunk>, StorageError>;

    /// All chunks of all videos in a subject, ordered by video then index.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn list_subject_chunks(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<VideoChunk>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_chunk(&self, id: ChunkId) -> Result<Option<VideoChunk>, StorageError>;

    /// Same contract as [`VideoRepository::set_video_watched`], for one chunk.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the chunk does not exist.
    async fn set_chunk_watched(&self, id: ChunkId, watched: bool) -> Result<bool, StorageError>;
}

/// Keyed daily logs, goals and streaks.
///
/// Every write is a read-modify-write on one key that the adapter performs atomically,
/// so concurrent writers to the same key add up instead of overwriting each other.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_daily_log(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        date: NaiveDate,
    ) -> Result<Option<DailyLog>, StorageError>;

    /// Add a signed number of seconds to a day's log, creating it at zero first. The
    /// total never drops below zero. Returns the log after the change.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the subject does not exist.
    async fn add_log_seconds(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        date: NaiveDate,
        delta_seconds: i64,
    ) -> Result<DailyLog, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_goal(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyGoal>, StorageError>;

    /// Add a signed number of seconds to a day's goal, creating it with
    /// `default_hours` first.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the goal cannot be stored.
    async fn add_goal_seconds(
        &self,
        user_id: UserId,
        date: NaiveDate,
        default_hours: f64,
        delta_seconds: i64,
    ) -> Result<GoalUpdate, StorageError>;

    /// Replace a day's target hours, keeping the completed time.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the goal cannot be stored.
    async fn set_goal_hours(
        &self,
        user_id: UserId,
        date: NaiveDate,
        goal_hours: f64,
    ) -> Result<GoalUpdate, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_streak(&self, user_id: UserId) -> Result<Option<Streak>, StorageError>;

    /// Count a goal crossing on `date` and return the updated streak.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the streak cannot be stored.
    async fn record_crossing(&self, user_id: UserId, date: NaiveDate)
    -> Result<Streak, StorageError>;

    /// Reset the current streak if it went stale before `today`; returns the result.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the streak cannot be stored.
    async fn refresh_streak(&self, user_id: UserId, today: NaiveDate)
    -> Result<Streak, StorageError>;
}

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// # Errors
    ///
    /// Returns `StorageError` on backend or mapping failures.
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError` if the profile cannot be stored.
    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError>;
}

//
// ─── IN-MEMORY ADAPTER ─────────────────────────────────────────────────────────
//

#[derive(Default)]
struct MemoryState {
    next_id: u64,
    exams: HashMap<ExamId, Exam>,
    subjects: HashMap<SubjectId, Subject>,
    videos: HashMap<VideoId, Video>,
    chunks: HashMap<ChunkId, VideoChunk>,
    logs: HashMap<(UserId, SubjectId, NaiveDate), DailyLog>,
    goals: HashMap<(UserId, NaiveDate), DailyGoal>,
    streaks: HashMap<UserId, Streak>,
    profiles: HashMap<UserId, UserProfile>,
}

impl MemoryState {
    fn allocate_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Mirrors the `ON DELETE CASCADE` chain of the SQL schema.
    fn remove_subject_videos(&mut self, subject_id: SubjectId) -> u64 {
        let before = self.videos.len();
        self.videos.retain(|_, v| v.subject_id != subject_id);
        let videos = &self.videos;
        self.chunks.retain(|_, c| videos.contains_key(&c.video_id()));
        (before - self.videos.len()) as u64
    }

    fn remove_subject(&mut self, subject_id: SubjectId) {
        self.subjects.remove(&subject_id);
        self.remove_subject_videos(subject_id);
        self.logs.retain(|(_, subject, _), _| *subject != subject_id);
    }
}

/// Simple in-memory repository implementation for testing and prototyping.
///
/// Every operation holds the one mutex for its whole read-modify-write.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>, StorageError> {
        self.state
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))
    }
}

fn model_err<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

#[async_trait]
impl ExamRepository for InMemoryRepository {
    async fn insert_exam(&self, exam: NewExamRecord) -> Result<ExamId, StorageError> {
        let mut guard = self.lock()?;
        let id = ExamId::new(guard.allocate_id());
        let exam = Exam::new(id, exam.user_id, exam.name, exam.description, exam.created_at)
            .map_err(model_err)?;
        guard.exams.insert(id, exam);
        Ok(id)
    }

    async fn get_exam(&self, id: ExamId) -> Result<Option<Exam>, StorageError> {
        Ok(self.lock()?.exams.get(&id).cloned())
    }

    async fn list_exams(&self, user_id: UserId) -> Result<Vec<Exam>, StorageError> {
        let guard = self.lock()?;
        let mut exams: Vec<Exam> = guard
            .exams
            .values()
            .filter(|e| e.user_id() == user_id)
            .cloned()
            .collect();
        exams.sort_by_key(Exam::id);
        Ok(exams)
    }

    async fn insert_subject(&self, subject: NewSubjectRecord) -> Result<SubjectId, StorageError> {
        let mut guard = self.lock()?;
        if !guard.exams.contains_key(&subject.exam_id) {
            return Err(StorageError::NotFound);
        }
        let id = SubjectId::new(guard.allocate_id());
        let subject = Subject::new(id, subject.exam_id, subject.name, subject.daily_goal_minutes)
            .map_err(model_err)?;
        guard.subjects.insert(id, subject);
        Ok(id)
    }

    async fn get_subject(&self, id: SubjectId) -> Result<Option<Subject>, StorageError> {
        Ok(self.lock()?.subjects.get(&id).cloned())
    }

    async fn list_subjects(&self, exam_id: ExamId) -> Result<Vec<Subject>, StorageError> {
        let guard = self.lock()?;
        let mut subjects: Vec<Subject> = guard
            .subjects
            .values()
            .filter(|s| s.exam_id() == exam_id)
            .cloned()
            .collect();
        subjects.sort_by_key(Subject::id);
        Ok(subjects)
    }

    async fn upsert_subject(&self, subject: &Subject) -> Result<(), StorageError> {
        self.lock()?.subjects.insert(subject.id(), subject.clone());
        Ok(())
    }

    async fn delete_exam(&self, id: ExamId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if guard.exams.remove(&id).is_none() {
            return Err(StorageError::NotFound);
        }
        let subjects: Vec<SubjectId> = guard
            .subjects
            .values()
            .filter(|s| s.exam_id() == id)
            .map(Subject::id)
            .collect();
        for subject_id in subjects {
            guard.remove_subject(subject_id);
        }
        Ok(())
    }

    async fn delete_subject(&self, id: SubjectId) -> Result<(), StorageError> {
        let mut guard = self.lock()?;
        if !guard.subjects.contains_key(&id) {
            return Err(StorageError::NotFound);
        }
        guard.remove_subject(id);
        Ok(())
    }
}

#[async_trait]
impl VideoRepository for InMemoryRepository {
    async fn insert_videos(&self, videos: &[NewVideoRecord]) -> Result<Vec<VideoId>, StorageError> {
        let mut guard = self.lock()?;
        if videos
            .iter()
            .any(|v| !guard.subjects.contains_key(&v.subject_id))
        {
            return Err(StorageError::NotFound);
        }
        let mut ids = Vec::with_capacity(videos.len());
        for record in videos {
            let id = VideoId::new(guard.allocate_id());
            guard.videos.insert(
                id,
                Video {
                    id,
                    subject_id: record.subject_id,
                    title: record.title.clone(),
                    external_id: record.external_id.clone(),
                    url: record.url.clone(),
                    duration_seconds: record.duration_seconds,
                    is_watched: false,
                    position: record.position,
                },
            );
            ids.push(id);
        }
        Ok(ids)
    }

    async fn get_video(&self, id: VideoId) -> Result<Option<Video>, StorageError> {
        Ok(self.lock()?.videos.get(&id).cloned())
    }

    async fn list_videos(&self, subject_id: SubjectId) -> Result<Vec<Video>, StorageError> {
        let guard = self.lock()?;
        let mut videos: Vec<Video> = guard
            .videos
            .values()
            .filter(|v| v.subject_id == subject_id)
            .cloned()
            .collect();
        videos.sort_by_key(|v| (v.position, v.id));
        Ok(videos)
    }

    async fn max_position(&self, subject_id: SubjectId) -> Result<Option<u32>, StorageError> {
        let guard = self.lock()?;
        Ok(guard
            .videos
            .values()
            .filter(|v| v.subject_id == subject_id)
            .map(|v| v.position)
            .max())
    }

    async fn set_video_watched(&self, id: VideoId, watched: bool) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let video = guard.videos.get_mut(&id).ok_or(StorageError::NotFound)?;
        let changed = video.is_watched != watched;
        video.is_watched = watched;
        Ok(changed)
    }

    async fn delete_subject_videos(&self, subject_id: SubjectId) -> Result<u64, StorageError> {
        Ok(self.lock()?.remove_subject_videos(subject_id))
    }

    async fn replace_chunks(
        &self,
        video_id: VideoId,
        chunks: &[NewChunkRecord],
    ) -> Result<Vec<VideoChunk>, StorageError> {
        let mut guard = self.lock()?;
        if !guard.videos.contains_key(&video_id) {
            return Err(StorageError::NotFound);
        }
        let mut stored = Vec::with_capacity(chunks.len());
        for record in chunks {
            let id = ChunkId::new(guard.allocate_id());
            let chunk = VideoChunk::new(
                id,
                video_id,
                record.index,
                record.start_seconds,
                record.end_seconds,
                record.title.clone(),
                record.is_watched,
            )
            .map_err(model_err)?;
            stored.push(chunk);
        }

        guard.chunks.retain(|_, c| c.video_id() != video_id);
        for chunk in &stored {
            guard.chunks.insert(chunk.id(), chunk.clone());
        }
        Ok(stored)
    }

    async fn list_chunks(&self, video_id: VideoId) -> Result<Vec<VideoChunk>, StorageError> {
        let guard = self.lock()?;
        let mut chunks: Vec<VideoChunk> = guard
            .chunks
            .values()
            .filter(|c| c.video_id() == video_id)
            .cloned()
            .collect();
        chunks.sort_by_key(VideoChunk::index);
        Ok(chunks)
    }

    async fn list_subject_chunks(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<VideoChunk>, StorageError> {
        let guard = self.lock()?;
        let mut chunks: Vec<VideoChunk> = guard
            .chunks
            .values()
            .filter(|c| {
                guard
                    .videos
                    .get(&c.video_id())
                    .is_some_and(|v| v.subject_id == subject_id)
            })
            .cloned()
            .collect();
        chunks.sort_by_key(|c| (c.video_id(), c.index()));
        Ok(chunks)
    }

    async fn get_chunk(&self, id: ChunkId) -> Result<Option<VideoChunk>, StorageError> {
        Ok(self.lock()?.chunks.get(&id).cloned())
    }

    async fn set_chunk_watched(&self, id: ChunkId, watched: bool) -> Result<bool, StorageError> {
        let mut guard = self.lock()?;
        let chunk = guard.chunks.get_mut(&id).ok_or(StorageError::NotFound)?;
        let changed = chunk.is_watched() != watched;
        chunk.set_watched(watched);
        Ok(changed)
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn get_daily_log(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        date: NaiveDate,
    ) -> Result<Option<DailyLog>, StorageError> {
        Ok(self.lock()?.logs.get(&(user_id, subject_id, date)).cloned())
    }

    async fn add_log_seconds(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        date: NaiveDate,
        delta_seconds: i64,
    ) -> Result<DailyLog, StorageError> {
        let mut guard = self.lock()?;
        if !guard.subjects.contains_key(&subject_id) {
            return Err(StorageError::NotFound);
        }
        let log = guard
            .logs
            .entry((user_id, subject_id, date))
            .or_insert_with(|| DailyLog::empty(user_id, subject_id, date));
        *log = apply_watch_toggle(log, delta_seconds.unsigned_abs(), delta_seconds >= 0);
        Ok(log.clone())
    }

    async fn get_goal(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Option<DailyGoal>, StorageError> {
        Ok(self.lock()?.goals.get(&(user_id, date)).cloned())
    }

    async fn add_goal_seconds(
        &self,
        user_id: UserId,
        date: NaiveDate,
        default_hours: f64,
        delta_seconds: i64,
    ) -> Result<GoalUpdate, StorageError> {
        let mut guard = self.lock()?;
        let goal = guard
            .goals
            .entry((user_id, date))
            .or_insert_with(|| DailyGoal::new(user_id, date, default_hours));
        let (updated, crossed) = apply_goal_progress(goal, delta_seconds);
        *goal = updated.clone();
        Ok(GoalUpdate {
            goal: updated,
            crossed,
        })
    }

    async fn set_goal_hours(
        &self,
        user_id: UserId,
        date: NaiveDate,
        goal_hours: f64,
    ) -> Result<GoalUpdate, StorageError> {
        let mut guard = self.lock()?;
        let goal = guard
            .goals
            .entry((user_id, date))
            .or_insert_with(|| DailyGoal::new(user_id, date, goal_hours));
        let (updated, crossed) = apply_goal_hours(goal, goal_hours);
        *goal = updated.clone();
        Ok(GoalUpdate {
            goal: updated,
            crossed,
        })
    }

    async fn get_streak(&self, user_id: UserId) -> Result<Option<Streak>, StorageError> {
        Ok(self.lock()?.streaks.get(&user_id).copied())
    }

    async fn record_crossing(
        &self,
        user_id: UserId,
        date: NaiveDate,
    ) -> Result<Streak, StorageError> {
        let mut guard = self.lock()?;
        let streak = guard.streaks.entry(user_id).or_default();
        *streak = update_streak(*streak, true, date);
        Ok(*streak)
    }

    async fn refresh_streak(
        &self,
        user_id: UserId,
        today: NaiveDate,
    ) -> Result<Streak, StorageError> {
        let mut guard = self.lock()?;
        let Some(streak) = guard.streaks.get_mut(&user_id) else {
            return Ok(Streak::default());
        };
        *streak = refresh_streak(*streak, today);
        Ok(*streak)
    }
}

#[async_trait]
impl ProfileRepository for InMemoryRepository {
    async fn get_profile(&self, user_id: UserId) -> Result<Option<UserProfile>, StorageError> {
        Ok(self.lock()?.profiles.get(&user_id).cloned())
    }

    async fn save_profile(&self, profile: &UserProfile) -> Result<(), StorageError> {
        self.lock()?
            .profiles
            .insert(profile.user_id, profile.clone());
        Ok(())
    }
}

/// Aggregates repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub exams: Arc<dyn ExamRepository>,
    pub videos: Arc<dyn VideoRepository>,
    pub progress: Arc<dyn ProgressRepository>,
    pub profiles: Arc<dyn ProfileRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        Self {
            exams: Arc::new(repo.clone()),
            videos: Arc::new(repo.clone()),
            progress: Arc::new(repo.clone()),
            profiles: Arc::new(repo),
        }
    }
}
