use std::collections::HashMap;
use std::io::Read;
use std::sync::Arc;

use storage::repository::{
    ExamRepository, NewChunkRecord, NewExamRecord, NewSubjectRecord, NewVideoRecord,
    ProfileRepository, ProgressRepository, StorageError, VideoRepository,
};
use study_core::chunking::{covered_by_watched, split_into_chunks};
use study_core::model::{
    Exam, ExamId, ModelError, PlaylistItem, Subject, SubjectId, TrackedVideo, UserId, UserProfile,
    VideoChunk, VideoId, Watchable, validate_name,
};
use study_core::progress::{SubjectProgress, minutes_rounded, percentage_shares};
use tracing::{debug, info};

use crate::Clock;
use crate::catalog::{PlaylistFetcher, usable_key};
use crate::csv_import::{ImportReport, parse_video_csv};
use crate::error::{FetchError, StudyServiceError};

/// Per-subject numbers shown on a dashboard.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectOverview {
    pub subject: Subject,
    pub progress: SubjectProgress,
    pub today_minutes: f64,
    pub daily_goal_minutes: u32,
}

/// One subject's slice of everything a user has watched.
#[derive(Debug, Clone, PartialEq)]
pub struct SubjectShare {
    pub exam_id: ExamId,
    pub subject_id: SubjectId,
    pub subject_name: String,
    pub watched_seconds: u64,
    pub share_percent: f64,
}

/// Watched time across all of a user's subjects.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct StudyAnalytics {
    pub total_watched_seconds: u64,
    /// Ordered by exam, then subject.
    pub subjects: Vec<SubjectShare>,
}

/// Orchestrates exams, subjects and the videos studied under them.
#[derive(Clone)]
pub struct StudyService {
    clock: Clock,
    exams: Arc<dyn ExamRepository>,
    videos: Arc<dyn VideoRepository>,
    progress: Arc<dyn ProgressRepository>,
    profiles: Arc<dyn ProfileRepository>,
    fetcher: PlaylistFetcher,
    env_api_key: Option<String>,
}

impl StudyService {
    #[must_use]
    pub fn new(
        clock: Clock,
        exams: Arc<dyn ExamRepository>,
        videos: Arc<dyn VideoRepository>,
        progress: Arc<dyn ProgressRepository>,
        profiles: Arc<dyn ProfileRepository>,
        fetcher: PlaylistFetcher,
    ) -> Self {
        Self {
            clock,
            exams,
            videos,
            progress,
            profiles,
            fetcher,
            env_api_key: None,
        }
    }

    /// Use a deployment-wide catalog key ahead of any key stored on a profile.
    #[must_use]
    pub fn with_env_api_key(mut self, key: Option<String>) -> Self {
        self.env_api_key = key.as_deref().and_then(usable_key);
        self
    }

    /// # Errors
    ///
    /// Returns `StudyServiceError::Model` for a blank name.
    /// Returns `StudyServiceError::Storage` if persistence fails.
    pub async fn create_exam(
        &self,
        user_id: UserId,
        name: &str,
        description: &str,
    ) -> Result<ExamId, StudyServiceError> {
        let name = validate_name(name, ModelError::EmptyExamName)?;
        let id = self
            .exams
            .insert_exam(NewExamRecord {
                user_id,
                name,
                description: description.to_owned(),
                created_at: self.clock.now(),
            })
            .await?;
        Ok(id)
    }

    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` if repository access fails.
    pub async fn list_exams(&self, user_id: UserId) -> Result<Vec<Exam>, StudyServiceError> {
        Ok(self.exams.list_exams(user_id).await?)
    }

    /// # Errors
    ///
    /// Returns `StudyServiceError::Model` for a blank name.
    /// Returns `StudyServiceError::Storage` (`NotFound`) if the exam does not exist.
    pub async fn create_subject(
        &self,
        exam_id: ExamId,
        name: &str,
        daily_goal_minutes: u32,
    ) -> Result<SubjectId, StudyServiceError> {
        let name = validate_name(name, ModelError::EmptySubjectName)?;
        let id = self
            .exams
            .insert_subject(NewSubjectRecord {
                exam_id,
                name,
                daily_goal_minutes,
            })
            .await?;
        Ok(id)
    }

    /// Delete one of the user's exams with everything under it.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` (`NotFound`) if the exam does not exist or
    /// belongs to another user.
    pub async fn delete_exam(
        &self,
        user_id: UserId,
        exam_id: ExamId,
    ) -> Result<(), StudyServiceError> {
        self.owned_exam(user_id, exam_id).await?;
        self.exams.delete_exam(exam_id).await?;
        info!(exam = %exam_id, "exam deleted");
        Ok(())
    }

    /// Delete one of the user's subjects with its videos, chunks and daily logs.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` (`NotFound`) if the subject does not exist
    /// or belongs to another user.
    pub async fn delete_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<(), StudyServiceError> {
        self.owned_subject(user_id, subject_id).await?;
        self.exams.delete_subject(subject_id).await?;
        info!(subject = %subject_id, "subject deleted");
        Ok(())
    }

    /// Remove every video (and chunk) from a subject, keeping the subject and the time
    /// already logged for it. Returns how many videos were removed.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` (`NotFound`) if the subject does not exist
    /// or belongs to another user.
    pub async fn delete_playlist(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, StudyServiceError> {
        self.owned_subject(user_id, subject_id).await?;
        let removed = self.videos.delete_subject_videos(subject_id).await?;
        info!(subject = %subject_id, removed, "playlist deleted");
        Ok(removed)
    }

    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` if repository access fails.
    pub async fn list_subjects(&self, exam_id: ExamId) -> Result<Vec<Subject>, StudyServiceError> {
        Ok(self.exams.list_subjects(exam_id).await?)
    }

    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` (`NotFound`) if the subject does not exist.
    pub async fn set_subject_goal_minutes(
        &self,
        subject_id: SubjectId,
        minutes: u32,
    ) -> Result<(), StudyServiceError> {
        let subject = self.subject(subject_id).await?;
        self.exams
            .upsert_subject(&subject.with_daily_goal_minutes(minutes))
            .await?;
        Ok(())
    }

    /// Store (or clear, for a blank value) the user's own catalog key.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` if persistence fails.
    pub async fn save_api_key(&self, user_id: UserId, key: &str) -> Result<(), StudyServiceError> {
        let mut profile = self
            .profiles
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(user_id));
        profile.catalog_api_key = usable_key(key);
        self.profiles.save_profile(&profile).await?;
        Ok(())
    }

    /// The key used for catalog calls: the deployment key, else the user's own.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Fetch(FetchError::MissingApiKey)` when neither is set.
    pub async fn resolve_api_key(&self, user_id: UserId) -> Result<String, StudyServiceError> {
        if let Some(key) = &self.env_api_key {
            return Ok(key.clone());
        }
        let profile_key = self
            .profiles
            .get_profile(user_id)
            .await?
            .and_then(|p| p.catalog_api_key)
            .and_then(|key| usable_key(&key));
        profile_key.ok_or(StudyServiceError::Fetch(FetchError::MissingApiKey))
    }

    /// Fetch a playlist and append its videos to the subject in playlist order.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Fetch` if the catalog call fails; nothing is stored
    /// in that case.
    /// Returns `StudyServiceError::Storage` if the subject does not exist or persistence fails.
    pub async fn add_playlist(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        playlist_url: &str,
    ) -> Result<Vec<VideoId>, StudyServiceError> {
        self.subject(subject_id).await?;
        let key = self.resolve_api_key(user_id).await?;
        let items = self.fetcher.fetch_playlist(playlist_url, &key).await?;
        let ids = self.append_items(subject_id, &items).await?;
        info!(subject = %subject_id, added = ids.len(), "playlist added");
        Ok(ids)
    }

    /// Fetch one video and append it to the subject.
    ///
    /// # Errors
    ///
    /// Same as [`StudyService::add_playlist`].
    pub async fn add_video(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        video_url: &str,
    ) -> Result<VideoId, StudyServiceError> {
        self.subject(subject_id).await?;
        let key = self.resolve_api_key(user_id).await?;
        let item = self.fetcher.fetch_single_video(video_url, &key).await?;
        let ids = self.append_items(subject_id, std::slice::from_ref(&item)).await?;
        ids.into_iter()
            .next()
            .ok_or(StudyServiceError::Storage(StorageError::Conflict))
    }

    /// Import videos from CSV. Rows that fail to parse or store are reported, not fatal.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Import` when the header is unusable.
    /// Returns `StudyServiceError::Storage` if the subject does not exist.
    pub async fn import_csv<R: Read>(
        &self,
        subject_id: SubjectId,
        input: R,
    ) -> Result<ImportReport, StudyServiceError> {
        let (rows, mut errors) = parse_video_csv(input)?;
        self.subject(subject_id).await?;

        let mut position = self.next_position(subject_id).await?;
        let mut created = 0;
        for row in rows {
            let record = NewVideoRecord::from_item(subject_id, &row.item, position);
            match self.videos.insert_videos(std::slice::from_ref(&record)).await {
                Ok(_) => {
                    position = position.saturating_add(1);
                    created += 1;
                }
                Err(err) => errors.push(format!("Row {}: {err}", row.row)),
            }
        }

        info!(subject = %subject_id, created, failed = errors.len(), "csv import finished");
        Ok(ImportReport { created, errors })
    }

    /// Split a video into fixed-length chunks, replacing any previous split.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Chunk` for a zero interval.
    /// Returns `StudyServiceError::Storage` (`NotFound`) if the video does not exist.
    pub async fn split_video(
        &self,
        video_id: VideoId,
        interval_minutes: u32,
    ) -> Result<Vec<VideoChunk>, StudyServiceError> {
        let video = self
            .videos
            .get_video(video_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let plan = split_into_chunks(&video.title, video.duration_seconds, interval_minutes)?;

        // Time already logged for this video stays logged: new chunks inside watched
        // ranges start out watched so they are not counted a second time.
        let existing = self.videos.list_chunks(video_id).await?;
        let watched: Vec<(u32, u32)> = if existing.is_empty() {
            if video.is_watched {
                vec![(0, video.duration_seconds)]
            } else {
                Vec::new()
            }
        } else {
            existing
                .iter()
                .filter(|c| c.is_watched())
                .map(|c| (c.start_seconds(), c.end_seconds()))
                .collect()
        };
        let flags = covered_by_watched(&plan, &watched);
        let records: Vec<NewChunkRecord> = plan
            .into_iter()
            .zip(flags)
            .map(|(chunk, watched)| NewChunkRecord::from(chunk).watched(watched))
            .collect();

        let chunks = self.videos.replace_chunks(video_id, &records).await?;
        debug!(
            video = %video_id,
            chunks = chunks.len(),
            carried = chunks.iter().filter(|c| c.is_watched()).count(),
            "video split"
        );
        Ok(chunks)
    }

    /// Videos of a subject in position order, each with its chunks.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` if repository access fails.
    pub async fn tracked_videos(
        &self,
        subject_id: SubjectId,
    ) -> Result<Vec<TrackedVideo>, StudyServiceError> {
        let videos = self.videos.list_videos(subject_id).await?;
        let mut chunks_by_video: HashMap<VideoId, Vec<VideoChunk>> = HashMap::new();
        for chunk in self.videos.list_subject_chunks(subject_id).await? {
            chunks_by_video.entry(chunk.video_id()).or_default().push(chunk);
        }
        Ok(videos
            .into_iter()
            .map(|video| {
                let chunks = chunks_by_video.remove(&video.id).unwrap_or_default();
                TrackedVideo { video, chunks }
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` (`NotFound`) if the subject does not exist.
    pub async fn subject_overview(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<SubjectOverview, StudyServiceError> {
        let subject = self.subject(subject_id).await?;
        let videos = self.tracked_videos(subject_id).await?;
        let today_seconds = self
            .progress
            .get_daily_log(user_id, subject_id, self.clock.today())
            .await?
            .map_or(0, |log| log.seconds_watched);
        Ok(SubjectOverview {
            daily_goal_minutes: subject.daily_goal_minutes(),
            subject,
            progress: SubjectProgress::from_videos(&videos),
            today_minutes: minutes_rounded(today_seconds),
        })
    }

    /// Watched time per subject across all of the user's exams, with each subject's
    /// percentage of the total.
    ///
    /// # Errors
    ///
    /// Returns `StudyServiceError::Storage` if repository access fails.
    pub async fn analytics(&self, user_id: UserId) -> Result<StudyAnalytics, StudyServiceError> {
        let mut subjects = Vec::new();
        for exam in self.exams.list_exams(user_id).await? {
            for subject in self.exams.list_subjects(exam.id()).await? {
                let videos = self.tracked_videos(subject.id()).await?;
                subjects.push((exam.id(), subject, SubjectProgress::from_videos(&videos)));
            }
        }

        let watched: Vec<u64> = subjects.iter().map(|(_, _, p)| p.watched_seconds).collect();
        let shares = percentage_shares(&watched);
        let subjects: Vec<SubjectShare> = subjects
            .into_iter()
            .zip(shares)
            .map(|((exam_id, subject, progress), share_percent)| SubjectShare {
                exam_id,
                subject_id: subject.id(),
                subject_name: subject.name().to_owned(),
                watched_seconds: progress.watched_seconds,
                share_percent,
            })
            .collect();
        Ok(StudyAnalytics {
            total_watched_seconds: watched.iter().sum(),
            subjects,
        })
    }

    async fn owned_exam(
        &self,
        user_id: UserId,
        exam_id: ExamId,
    ) -> Result<Exam, StudyServiceError> {
        let exam = self
            .exams
            .get_exam(exam_id)
            .await?
            .filter(|exam| exam.user_id() == user_id)
            .ok_or(StorageError::NotFound)?;
        Ok(exam)
    }

    async fn owned_subject(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<Subject, StudyServiceError> {
        let subject = self.subject(subject_id).await?;
        self.owned_exam(user_id, subject.exam_id()).await?;
        Ok(subject)
    }

    async fn subject(&self, subject_id: SubjectId) -> Result<Subject, StudyServiceError> {
        Ok(self
            .exams
            .get_subject(subject_id)
            .await?
            .ok_or(StorageError::NotFound)?)
    }

    async fn next_position(&self, subject_id: SubjectId) -> Result<u32, StudyServiceError> {
        Ok(self
            .videos
            .max_position(subject_id)
            .await?
            .map_or(0, |p| p.saturating_add(1)))
    }

    async fn append_items(
        &self,
        subject_id: SubjectId,
        items: &[PlaylistItem],
    ) -> Result<Vec<VideoId>, StudyServiceError> {
        let start = self.next_position(subject_id).await?;
        let records: Vec<NewVideoRecord> = items
            .iter()
            .zip(start..)
            .map(|(item, position)| NewVideoRecord::from_item(subject_id, item, position))
            .collect();
        Ok(self.videos.insert_videos(&records).await?)
    }
}
