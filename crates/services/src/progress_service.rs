use std::sync::Arc;

use storage::repository::{ProfileRepository, ProgressRepository, StorageError, VideoRepository};
use study_core::model::{
    ChunkId, DailyGoal, Streak, SubjectId, UserId, UserProfile, VideoId, Watchable,
};
use study_core::progress::minutes_rounded;
use tracing::{debug, info};

use crate::Clock;
use crate::error::ProgressServiceError;

/// What a watch toggle or focus session did to today's numbers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOutcome {
    /// False when the flag already had the requested value and nothing was written.
    pub changed: bool,
    /// Seconds logged today for the subject after the change.
    pub today_seconds: u64,
    pub goal_crossed: bool,
    pub streak: Streak,
}

/// Applies watch toggles and focus time to daily logs, goals and streaks.
///
/// Every path that moves time goes through the same log/goal/streak update, built on
/// the repositories' atomic delta operations.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    videos: Arc<dyn VideoRepository>,
    progress: Arc<dyn ProgressRepository>,
    profiles: Arc<dyn ProfileRepository>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        videos: Arc<dyn VideoRepository>,
        progress: Arc<dyn ProgressRepository>,
        profiles: Arc<dyn ProfileRepository>,
    ) -> Self {
        Self {
            clock,
            videos,
            progress,
            profiles,
        }
    }

    /// Mark a whole video watched or unwatched.
    ///
    /// For a video that has been split, only the flag changes; time is tracked
    /// through its chunks.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` (`NotFound`) if the video does not exist.
    pub async fn set_video_watched(
        &self,
        user_id: UserId,
        video_id: VideoId,
        watched: bool,
    ) -> Result<WatchOutcome, ProgressServiceError> {
        let video = self
            .videos
            .get_video(video_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        // The flip itself decides who logs time when the same toggle arrives twice.
        if !self.videos.set_video_watched(video_id, watched).await? {
            return self.unchanged(user_id, video.subject_id).await;
        }

        if !self.videos.list_chunks(video_id).await?.is_empty() {
            debug!(video = %video_id, watched, "chunked video flag changed without logging time");
            let mut outcome = self.unchanged(user_id, video.subject_id).await?;
            outcome.changed = true;
            return Ok(outcome);
        }

        self.apply_delta(
            user_id,
            video.subject_id,
            u64::from(video.duration_seconds()),
            watched,
        )
        .await
    }

    /// Mark one chunk watched or unwatched, logging its length.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` (`NotFound`) if the chunk or its video
    /// does not exist.
    pub async fn set_chunk_watched(
        &self,
        user_id: UserId,
        chunk_id: ChunkId,
        watched: bool,
    ) -> Result<WatchOutcome, ProgressServiceError> {
        let chunk = self
            .videos
            .get_chunk(chunk_id)
            .await?
            .ok_or(StorageError::NotFound)?;
        let video = self
            .videos
            .get_video(chunk.video_id())
            .await?
            .ok_or(StorageError::NotFound)?;
        if !self.videos.set_chunk_watched(chunk_id, watched).await? {
            return self.unchanged(user_id, video.subject_id).await;
        }

        self.apply_delta(
            user_id,
            video.subject_id,
            u64::from(chunk.duration_seconds()),
            watched,
        )
        .await
    }

    /// Add time from a focus timer to today's log and goal.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persistence fails, `NotFound` for
    /// an unknown subject.
    pub async fn record_focus_session(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        seconds: u64,
    ) -> Result<WatchOutcome, ProgressServiceError> {
        if seconds == 0 {
            return self.unchanged(user_id, subject_id).await;
        }
        self.apply_delta(user_id, subject_id, seconds, true).await
    }

    /// Set today's goal and the default used for future days.
    ///
    /// Lowering the goal to or below the time already studied achieves it.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persistence fails.
    pub async fn set_daily_goal(
        &self,
        user_id: UserId,
        hours: f64,
    ) -> Result<DailyGoal, ProgressServiceError> {
        let today = self.clock.today();
        let mut profile = self.profile(user_id).await?;
        profile.default_goal_hours = DailyGoal::new(user_id, today, hours).goal_hours;
        self.profiles.save_profile(&profile).await?;

        let update = self
            .progress
            .set_goal_hours(user_id, today, profile.default_goal_hours)
            .await?;
        if update.crossed {
            info!(user = %user_id, %today, "daily goal reached by lowering it");
            self.progress.record_crossing(user_id, today).await?;
        }
        Ok(update.goal)
    }

    /// The daily staleness check: resets a streak whose last achieved day is before
    /// yesterday.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if persistence fails.
    pub async fn daily_check(&self, user_id: UserId) -> Result<Streak, ProgressServiceError> {
        let before = self.streak(user_id).await?;
        let refreshed = self
            .progress
            .refresh_streak(user_id, self.clock.today())
            .await?;
        if refreshed.current_streak < before.current_streak {
            info!(user = %user_id, lost = before.current_streak, "streak reset");
        }
        Ok(refreshed)
    }

    /// Minutes logged today for a subject, one decimal place.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn today_minutes(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<f64, ProgressServiceError> {
        Ok(minutes_rounded(self.today_seconds(user_id, subject_id).await?))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn today_goal(&self, user_id: UserId) -> Result<DailyGoal, ProgressServiceError> {
        let today = self.clock.today();
        if let Some(goal) = self.progress.get_goal(user_id, today).await? {
            return Ok(goal);
        }
        let profile = self.profile(user_id).await?;
        Ok(DailyGoal::new(user_id, today, profile.default_goal_hours))
    }

    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn streak(&self, user_id: UserId) -> Result<Streak, ProgressServiceError> {
        Ok(self.progress.get_streak(user_id).await?.unwrap_or_default())
    }

    async fn apply_delta(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
        seconds: u64,
        watched: bool,
    ) -> Result<WatchOutcome, ProgressServiceError> {
        let today = self.clock.today();
        let magnitude = i64::try_from(seconds).unwrap_or(i64::MAX);
        let delta = if watched { magnitude } else { -magnitude };

        let log = self
            .progress
            .add_log_seconds(user_id, subject_id, today, delta)
            .await?;
        let profile = self.profile(user_id).await?;
        let update = self
            .progress
            .add_goal_seconds(user_id, today, profile.default_goal_hours, delta)
            .await?;

        let streak = if update.crossed {
            info!(user = %user_id, %today, "daily goal reached");
            self.progress.record_crossing(user_id, today).await?
        } else {
            self.streak(user_id).await?
        };
        debug!(
            user = %user_id,
            subject = %subject_id,
            delta,
            today_seconds = log.seconds_watched,
            completed_seconds = update.goal.completed_seconds,
            "progress updated"
        );

        Ok(WatchOutcome {
            changed: true,
            today_seconds: log.seconds_watched,
            goal_crossed: update.crossed,
            streak,
        })
    }

    async fn unchanged(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<WatchOutcome, ProgressServiceError> {
        Ok(WatchOutcome {
            changed: false,
            today_seconds: self.today_seconds(user_id, subject_id).await?,
            goal_crossed: false,
            streak: self.streak(user_id).await?,
        })
    }

    async fn today_seconds(
        &self,
        user_id: UserId,
        subject_id: SubjectId,
    ) -> Result<u64, ProgressServiceError> {
        Ok(self
            .progress
            .get_daily_log(user_id, subject_id, self.clock.today())
            .await?
            .map_or(0, |log| log.seconds_watched))
    }

    async fn profile(&self, user_id: UserId) -> Result<UserProfile, ProgressServiceError> {
        Ok(self
            .profiles
            .get_profile(user_id)
            .await?
            .unwrap_or_else(|| UserProfile::new(user_id)))
    }
}

#[cfg(test)]
mod tests {
    use storage::repository::{
        ExamRepository, NewChunkRecord, NewExamRecord, NewSubjectRecord, NewVideoRecord,
        InMemoryRepository,
    };
    use study_core::chunking::split_into_chunks;
    use study_core::model::PlaylistItem;
    use study_core::time::{fixed_clock, fixed_now};

    use super::*;

    struct Fixture {
        repo: Arc<InMemoryRepository>,
        user: UserId,
        subject: SubjectId,
        short: VideoId,
        long: VideoId,
    }

    async fn fixture() -> Fixture {
        let repo = Arc::new(InMemoryRepository::new());
        let exam = repo
            .insert_exam(NewExamRecord {
                user_id: UserId::new(1),
                name: "Boards".into(),
                description: String::new(),
                created_at: fixed_now(),
            })
            .await
            .unwrap();
        let subject = repo
            .insert_subject(NewSubjectRecord {
                exam_id: exam,
                name: "Anatomy".into(),
                daily_goal_minutes: 30,
            })
            .await
            .unwrap();
        let ids = repo
            .insert_videos(&[
                NewVideoRecord::from_item(subject, &PlaylistItem::new("Short", "s", 1800), 0),
                NewVideoRecord::from_item(subject, &PlaylistItem::new("Long", "l", 3000), 1),
            ])
            .await
            .unwrap();
        Fixture {
            repo,
            user: UserId::new(1),
            subject,
            short: ids[0],
            long: ids[1],
        }
    }

    fn service(repo: &Arc<InMemoryRepository>, clock: Clock) -> ProgressService {
        ProgressService::new(clock, repo.clone(), repo.clone(), repo.clone())
    }

    #[tokio::test]
    async fn watching_logs_time_and_unwatching_takes_it_back() {
        let f = fixture().await;
        let service = service(&f.repo, fixed_clock());

        let outcome = service.set_video_watched(f.user, f.short, true).await.unwrap();
        assert!(outcome.changed);
        assert_eq!(outcome.today_seconds, 1800);
        assert!((service.today_minutes(f.user, f.subject).await.unwrap() - 30.0).abs() < 1e-9);

        let repeat = service.set_video_watched(f.user, f.short, true).await.unwrap();
        assert!(!repeat.changed);
        assert_eq!(repeat.today_seconds, 1800);

        let undone = service.set_video_watched(f.user, f.short, false).await.unwrap();
        assert_eq!(undone.today_seconds, 0);
        assert_eq!(service.today_goal(f.user).await.unwrap().completed_seconds, 0);
    }

    #[tokio::test]
    async fn crossing_the_goal_starts_a_streak_once() {
        let f = fixture().await;
        let service = service(&f.repo, fixed_clock());
        service.set_daily_goal(f.user, 0.5).await.unwrap();

        let first = service.set_video_watched(f.user, f.short, true).await.unwrap();
        assert!(first.goal_crossed);
        assert_eq!(first.streak.current_streak, 1);

        service.set_video_watched(f.user, f.short, false).await.unwrap();
        let again = service.set_video_watched(f.user, f.short, true).await.unwrap();
        assert!(!again.goal_crossed);
        assert_eq!(again.streak.current_streak, 1);
        assert!(service.today_goal(f.user).await.unwrap().achieved);
    }

    #[tokio::test]
    async fn consecutive_days_extend_and_gaps_reset() {
        let f = fixture().await;
        let mut clock = fixed_clock();
        service(&f.repo, clock).set_daily_goal(f.user, 0.25).await.unwrap();

        for _ in 0..2 {
            let s = service(&f.repo, clock);
            s.record_focus_session(f.user, f.subject, 900).await.unwrap();
            clock.advance_days(1);
        }
        let s = service(&f.repo, clock);
        assert_eq!(s.streak(f.user).await.unwrap().current_streak, 2);

        clock.advance_days(1);
        let s = service(&f.repo, clock);
        let streak = s.daily_check(f.user).await.unwrap();
        assert_eq!(streak.current_streak, 0);
        assert_eq!(streak.best_streak, 2);
    }

    #[tokio::test]
    async fn chunked_videos_log_through_their_chunks() {
        let f = fixture().await;
        let plan: Vec<NewChunkRecord> = split_into_chunks("Long", 3000, 20)
            .unwrap()
            .into_iter()
            .map(NewChunkRecord::from)
            .collect();
        let chunks = f.repo.replace_chunks(f.long, &plan).await.unwrap();
        let service = service(&f.repo, fixed_clock());

        let parent = service.set_video_watched(f.user, f.long, true).await.unwrap();
        assert!(parent.changed);
        assert_eq!(parent.today_seconds, 0);

        let outcome = service
            .set_chunk_watched(f.user, chunks[2].id(), true)
            .await
            .unwrap();
        assert_eq!(outcome.today_seconds, 600);
        let repeat = service
            .set_chunk_watched(f.user, chunks[2].id(), true)
            .await
            .unwrap();
        assert!(!repeat.changed);
    }

    #[tokio::test]
    async fn lowering_goal_below_studied_time_achieves_it() {
        let f = fixture().await;
        let service = service(&f.repo, fixed_clock());
        service.set_daily_goal(f.user, 2.0).await.unwrap();
        service
            .record_focus_session(f.user, f.subject, 3600)
            .await
            .unwrap();

        let goal = service.set_daily_goal(f.user, 1.0).await.unwrap();
        assert!(goal.achieved);
        assert_eq!(service.streak(f.user).await.unwrap().current_streak, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn identical_concurrent_toggles_log_once() {
        let f = fixture().await;
        let service = service(&f.repo, fixed_clock());
        service.set_daily_goal(f.user, 0.5).await.unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let (user, video) = (f.user, f.short);
            handles.push(tokio::spawn(async move {
                service.set_video_watched(user, video, true).await.unwrap()
            }));
        }
        let mut changed = 0;
        let mut crossings = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            changed += usize::from(outcome.changed);
            crossings += usize::from(outcome.goal_crossed);
        }

        assert_eq!(changed, 1);
        assert_eq!(crossings, 1);
        assert_eq!(service.today_goal(f.user).await.unwrap().completed_seconds, 1800);
        assert_eq!(service.streak(f.user).await.unwrap().current_streak, 1);
    }

    #[tokio::test]
    async fn focus_on_unknown_subject_is_not_found() {
        let f = fixture().await;
        let err = service(&f.repo, fixed_clock())
            .record_focus_session(f.user, SubjectId::new(404), 600)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Storage(StorageError::NotFound)
        ));
    }

    #[tokio::test]
    async fn missing_video_is_not_found() {
        let f = fixture().await;
        let err = service(&f.repo, fixed_clock())
            .set_video_watched(f.user, VideoId::new(404), true)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ProgressServiceError::Storage(StorageError::NotFound)
        ));
    }
}
