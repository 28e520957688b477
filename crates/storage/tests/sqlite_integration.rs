use chrono::Duration;
use storage::repository::{
    ExamRepository, NewChunkRecord, NewExamRecord, NewSubjectRecord, NewVideoRecord,
    ProfileRepository, ProgressRepository, StorageError, VideoRepository,
};
use storage::sqlite::SqliteRepository;
use study_core::chunking::split_into_chunks;
use study_core::model::{PlaylistItem, Streak, SubjectId, UserId, UserProfile, VideoId, Watchable};
use study_core::time::fixed_now;

async fn connect(name: &str) -> SqliteRepository {
    let repo = SqliteRepository::connect(&format!("sqlite:file:{name}?mode=memory&cache=shared"))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

/// A fresh database file in the temp dir; concurrent writers need real file locking.
async fn connect_file(name: &str) -> SqliteRepository {
    let path = std::env::temp_dir().join(format!("{name}-{}.sqlite3", std::process::id()));
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
    let repo = SqliteRepository::connect(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .expect("connect");
    repo.migrate().await.expect("migrate");
    repo
}

async fn seed_subject(repo: &SqliteRepository) -> SubjectId {
    let exam_id = repo
        .insert_exam(NewExamRecord {
            user_id: UserId::new(7),
            name: "GATE 2026".into(),
            description: "CS paper".into(),
            created_at: fixed_now(),
        })
        .await
        .unwrap();
    repo.insert_subject(NewSubjectRecord {
        exam_id,
        name: "Operating Systems".into(),
        daily_goal_minutes: 90,
    })
    .await
    .unwrap()
}

#[tokio::test]
async fn sqlite_roundtrips_exams_subjects_and_videos() {
    let repo = connect("memdb_catalog").await;
    let subject_id = seed_subject(&repo).await;

    let exams = repo.list_exams(UserId::new(7)).await.unwrap();
    assert_eq!(exams.len(), 1);
    assert_eq!(exams[0].name(), "GATE 2026");
    assert!(repo.list_exams(UserId::new(8)).await.unwrap().is_empty());

    let subject = repo.get_subject(subject_id).await.unwrap().unwrap();
    assert_eq!(subject.daily_goal_minutes(), 90);
    repo.upsert_subject(&subject.with_daily_goal_minutes(45))
        .await
        .unwrap();
    let subject = repo.get_subject(subject_id).await.unwrap().unwrap();
    assert_eq!(subject.daily_goal_minutes(), 45);

    let items = [
        PlaylistItem::new("Paging", "vid-b", 900),
        PlaylistItem::new("Scheduling", "vid-a", 1200),
    ];
    let records: Vec<NewVideoRecord> = items
        .iter()
        .enumerate()
        .map(|(i, item)| NewVideoRecord::from_item(subject_id, item, u32::try_from(i).unwrap()))
        .collect();
    let ids = repo.insert_videos(&records).await.unwrap();
    assert_eq!(ids.len(), 2);

    let videos = repo.list_videos(subject_id).await.unwrap();
    assert_eq!(videos[0].title, "Paging");
    assert_eq!(videos[1].duration_seconds, 1200);
    assert!(!videos[0].is_watched);
    assert_eq!(repo.max_position(subject_id).await.unwrap(), Some(1));

    assert!(repo.set_video_watched(ids[1], true).await.unwrap());
    assert!(repo.get_video(ids[1]).await.unwrap().unwrap().is_watched);
    assert!(!repo.set_video_watched(ids[1], true).await.unwrap());

    let err = repo
        .set_video_watched(VideoId::new(9_999), true)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}

#[tokio::test]
async fn sqlite_replaces_chunks_and_tracks_flags() {
    let repo = connect("memdb_chunks").await;
    let subject_id = seed_subject(&repo).await;
    let ids = repo
        .insert_videos(&[NewVideoRecord::from_item(
            subject_id,
            &PlaylistItem::new("Deadlocks", "vid-c", 3000),
            0,
        )])
        .await
        .unwrap();

    let plan: Vec<NewChunkRecord> = split_into_chunks("Deadlocks", 3000, 20)
        .unwrap()
        .into_iter()
        .map(NewChunkRecord::from)
        .collect();
    let chunks = repo.replace_chunks(ids[0], &plan).await.unwrap();
    assert_eq!(chunks.len(), 3);

    assert!(repo.set_chunk_watched(chunks[0].id(), true).await.unwrap());
    assert!(!repo.set_chunk_watched(chunks[0].id(), true).await.unwrap());
    let listed = repo.list_subject_chunks(subject_id).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed[2].start_seconds(), 2400);
    assert_eq!(listed[2].end_seconds(), 3000);

    let replanned: Vec<NewChunkRecord> = split_into_chunks("Deadlocks", 3000, 30)
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, plan)| NewChunkRecord::from(plan).watched(i == 0))
        .collect();
    repo.replace_chunks(ids[0], &replanned).await.unwrap();
    let stored = repo.list_chunks(ids[0]).await.unwrap();
    assert_eq!(stored.len(), 2);
    assert!(stored[0].is_watched());
    assert!(!stored[1].is_watched());
}

#[tokio::test]
async fn sqlite_applies_progress_deltas_by_key() {
    let repo = connect("memdb_progress").await;
    let subject_id = seed_subject(&repo).await;
    let user = UserId::new(7);
    let today = fixed_now().date_naive();

    repo.add_log_seconds(user, subject_id, today, 600).await.unwrap();
    let log = repo.add_log_seconds(user, subject_id, today, -900).await.unwrap();
    assert_eq!(log.seconds_watched, 0);
    let log = repo.add_log_seconds(user, subject_id, today, 300).await.unwrap();
    assert_eq!(log.seconds_watched, 300);
    assert_eq!(
        repo.get_daily_log(user, subject_id, today)
            .await
            .unwrap()
            .unwrap()
            .seconds_watched,
        300
    );
    let err = repo
        .add_log_seconds(user, SubjectId::new(9_999), today, 60)
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let first = repo.add_goal_seconds(user, today, 1.0, 3000).await.unwrap();
    assert!(!first.crossed);
    let second = repo.add_goal_seconds(user, today, 4.0, 600).await.unwrap();
    assert!(second.crossed);
    assert!((second.goal.goal_hours - 1.0).abs() < 1e-9);

    // Dipping below and coming back does not count twice.
    repo.add_goal_seconds(user, today, 1.0, -3000).await.unwrap();
    let back = repo.add_goal_seconds(user, today, 1.0, 3000).await.unwrap();
    assert!(!back.crossed);
    let stored = repo.get_goal(user, today).await.unwrap().unwrap();
    assert!(stored.achieved);
    assert_eq!(stored.completed_seconds, 3600);

    let yesterday = today - Duration::days(1);
    assert!(repo.get_goal(user, yesterday).await.unwrap().is_none());
    let lowered = repo.set_goal_hours(user, yesterday, 0.0).await.unwrap();
    assert!(!lowered.crossed);
}

#[tokio::test]
async fn sqlite_streak_counts_and_refreshes() {
    let repo = connect("memdb_streak").await;
    let user = UserId::new(7);
    let today = fixed_now().date_naive();

    assert_eq!(repo.refresh_streak(user, today).await.unwrap(), Streak::default());
    repo.record_crossing(user, today - Duration::days(1)).await.unwrap();
    let streak = repo.record_crossing(user, today).await.unwrap();
    assert_eq!(streak.current_streak, 2);
    assert_eq!(repo.record_crossing(user, today).await.unwrap(), streak);

    let later = repo.refresh_streak(user, today + Duration::days(3)).await.unwrap();
    assert_eq!(later.current_streak, 0);
    assert_eq!(later.best_streak, 2);
    assert_eq!(repo.get_streak(user).await.unwrap(), Some(later));
}

#[tokio::test]
async fn sqlite_deletes_cascade() {
    let repo = connect("memdb_deletes").await;
    let subject_id = seed_subject(&repo).await;
    let exam_id = repo.get_subject(subject_id).await.unwrap().unwrap().exam_id();
    let ids = repo
        .insert_videos(&[
            NewVideoRecord::from_item(subject_id, &PlaylistItem::new("Pipes", "p", 600), 0),
            NewVideoRecord::from_item(subject_id, &PlaylistItem::new("Signals", "s", 600), 1),
        ])
        .await
        .unwrap();
    let plan: Vec<NewChunkRecord> = split_into_chunks("Pipes", 600, 5)
        .unwrap()
        .into_iter()
        .map(NewChunkRecord::from)
        .collect();
    repo.replace_chunks(ids[0], &plan).await.unwrap();
    let today = fixed_now().date_naive();
    repo.add_log_seconds(UserId::new(7), subject_id, today, 120).await.unwrap();

    assert_eq!(repo.delete_subject_videos(subject_id).await.unwrap(), 2);
    assert!(repo.list_subject_chunks(subject_id).await.unwrap().is_empty());
    assert!(repo.get_subject(subject_id).await.unwrap().is_some());
    assert!(
        repo.get_daily_log(UserId::new(7), subject_id, today)
            .await
            .unwrap()
            .is_some()
    );

    repo.delete_exam(exam_id).await.unwrap();
    assert!(repo.get_subject(subject_id).await.unwrap().is_none());
    assert!(
        repo.get_daily_log(UserId::new(7), subject_id, today)
            .await
            .unwrap()
            .is_none()
    );
    assert!(matches!(
        repo.delete_exam(exam_id).await.unwrap_err(),
        StorageError::NotFound
    ));
    assert!(matches!(
        repo.delete_subject(subject_id).await.unwrap_err(),
        StorageError::NotFound
    ));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn sqlite_concurrent_writers_add_up() {
    let repo = connect_file("study-storage-concurrency").await;
    let subject_id = seed_subject(&repo).await;
    let user = UserId::new(7);
    let today = fixed_now().date_naive();

    let mut handles = Vec::new();
    for _ in 0..32 {
        let repo = repo.clone();
        handles.push(tokio::spawn(async move {
            repo.add_log_seconds(user, subject_id, today, 100).await.unwrap();
            repo.add_goal_seconds(user, today, 0.5, 100).await.unwrap()
        }));
    }
    let mut crossings = 0;
    for handle in handles {
        if handle.await.unwrap().crossed {
            crossings += 1;
        }
    }

    let log = repo.get_daily_log(user, subject_id, today).await.unwrap().unwrap();
    assert_eq!(log.seconds_watched, 3200);
    let goal = repo.get_goal(user, today).await.unwrap().unwrap();
    assert_eq!(goal.completed_seconds, 3200);
    assert!(goal.achieved);
    assert_eq!(crossings, 1);

    let ids = repo
        .insert_videos(&[NewVideoRecord::from_item(
            subject_id,
            &PlaylistItem::new("Threads", "t", 60),
            0,
        )])
        .await
        .unwrap();
    let mut flips = Vec::new();
    for _ in 0..8 {
        let repo = repo.clone();
        let id = ids[0];
        flips.push(tokio::spawn(async move { repo.set_video_watched(id, true).await.unwrap() }));
    }
    let mut changed = 0;
    for flip in flips {
        if flip.await.unwrap() {
            changed += 1;
        }
    }
    assert_eq!(changed, 1);
}

#[tokio::test]
async fn sqlite_saves_profiles() {
    let repo = connect("memdb_profiles").await;
    let user = UserId::new(3);
    assert!(repo.get_profile(user).await.unwrap().is_none());

    let mut profile = UserProfile::new(user);
    profile.catalog_api_key = Some("key-123".into());
    profile.default_goal_hours = 1.5;
    repo.save_profile(&profile).await.unwrap();

    let stored = repo.get_profile(user).await.unwrap().unwrap();
    assert_eq!(stored.catalog_api_key.as_deref(), Some("key-123"));
    assert_eq!(stored.default_goal_hours, 1.5);
}
