use std::sync::Arc;

use serde_json::json;
use services::catalog::ScriptedTransport;
use services::{AppServices, Clock, FetchError, PlaylistFetcher, StudyServiceError};
use storage::repository::Storage;
use study_core::model::UserId;
use study_core::time::fixed_now;

const PLAYLIST: &str = "https://www.youtube.com/playlist?list=PLflow";

fn script_two_pages(transport: &ScriptedTransport) {
    transport.push_json(json!({
        "items": [
            { "snippet": { "title": "Lecture 1", "resourceId": { "videoId": "v1" } } },
            { "snippet": { "title": "Private video", "resourceId": { "videoId": "hidden" } } },
        ],
        "nextPageToken": "P2"
    }));
    transport.push_json(json!({
        "items": [{ "id": "v1", "contentDetails": { "duration": "PT50M" } }]
    }));
    transport.push_json(json!({
        "items": [
            { "snippet": { "title": "Lecture 2", "resourceId": { "videoId": "v2" } } },
        ]
    }));
    transport.push_json(json!({
        "items": [{ "id": "v2", "contentDetails": { "duration": "PT30M" } }]
    }));
}

#[tokio::test]
async fn playlist_to_streak_on_sqlite() {
    let storage = Storage::sqlite("sqlite:file:study_flow?mode=memory&cache=shared")
        .await
        .unwrap();
    let transport = ScriptedTransport::new();
    let clock = Clock::fixed(fixed_now());
    let services = AppServices::from_storage(
        &storage,
        clock,
        PlaylistFetcher::new(Arc::new(transport.clone())),
        Some("env-key".into()),
    );
    let study = services.study();
    let progress = services.progress();
    let user = UserId::new(1);

    let exam = study.create_exam(user, "USMLE", "step 1").await.unwrap();
    let subject = study.create_subject(exam, "Physiology", 45).await.unwrap();

    script_two_pages(&transport);
    let ids = study.add_playlist(user, subject, PLAYLIST).await.unwrap();
    assert_eq!(ids.len(), 2);
    assert!(
        transport
            .requests()
            .iter()
            .all(|r| r.param("key") == Some("env-key"))
    );

    let chunks = study.split_video(ids[0], 20).await.unwrap();
    assert_eq!(chunks.len(), 3);

    progress.set_daily_goal(user, 0.5).await.unwrap();
    let first = progress
        .set_chunk_watched(user, chunks[0].id(), true)
        .await
        .unwrap();
    assert_eq!(first.today_seconds, 1200);
    assert!(!first.goal_crossed);

    let second = progress.set_video_watched(user, ids[1], true).await.unwrap();
    assert_eq!(second.today_seconds, 3000);
    assert!(second.goal_crossed);
    assert_eq!(second.streak.current_streak, 1);

    let overview = study.subject_overview(user, subject).await.unwrap();
    assert_eq!(overview.progress.total_units, 4);
    assert_eq!(overview.progress.completed_units, 2);
    assert!((overview.progress.degrees - 180.0).abs() < 1e-9);
    assert!((overview.today_minutes - 50.0).abs() < 1e-9);
}

#[tokio::test]
async fn missing_key_never_reaches_the_catalog() {
    let storage = Storage::in_memory();
    let transport = ScriptedTransport::new();
    let services = AppServices::from_storage(
        &storage,
        Clock::fixed(fixed_now()),
        PlaylistFetcher::new(Arc::new(transport.clone())),
        None,
    );
    let study = services.study();
    let user = UserId::new(2);
    let exam = study.create_exam(user, "Bar exam", "").await.unwrap();
    let subject = study.create_subject(exam, "Torts", 30).await.unwrap();

    let err = study.add_playlist(user, subject, PLAYLIST).await.unwrap_err();
    assert!(matches!(
        err,
        StudyServiceError::Fetch(FetchError::MissingApiKey)
    ));
    assert!(transport.requests().is_empty());
}

#[tokio::test]
async fn splitting_a_watched_video_does_not_count_it_twice() {
    let storage = Storage::in_memory();
    let services = AppServices::from_storage(
        &storage,
        Clock::fixed(fixed_now()),
        PlaylistFetcher::new(Arc::new(ScriptedTransport::new())),
        None,
    );
    let study = services.study();
    let progress = services.progress();
    let user = UserId::new(3);
    let exam = study.create_exam(user, "Boards", "").await.unwrap();
    let subject = study.create_subject(exam, "Renal", 60).await.unwrap();
    study
        .import_csv(subject, "title,duration\nFiltration,50:00\n".as_bytes())
        .await
        .unwrap();
    let video = study.tracked_videos(subject).await.unwrap()[0].video.id;

    let whole = progress.set_video_watched(user, video, true).await.unwrap();
    assert_eq!(whole.today_seconds, 3000);

    let chunks = study.split_video(video, 20).await.unwrap();
    let again = progress
        .set_chunk_watched(user, chunks[0].id(), true)
        .await
        .unwrap();
    assert!(!again.changed);
    assert_eq!(again.today_seconds, 3000);

    let undone = progress
        .set_chunk_watched(user, chunks[2].id(), false)
        .await
        .unwrap();
    assert_eq!(undone.today_seconds, 2400);

    let resplit = study.split_video(video, 10).await.unwrap();
    let last = progress
        .set_chunk_watched(user, resplit[4].id(), true)
        .await
        .unwrap();
    assert!(last.changed);
    assert_eq!(last.today_seconds, 3000);
    assert_eq!(progress.today_goal(user).await.unwrap().completed_seconds, 3000);
}
