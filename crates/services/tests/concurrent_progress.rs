use std::sync::Arc;

use services::catalog::ScriptedTransport;
use services::{AppServices, Clock, PlaylistFetcher};
use storage::repository::{NewVideoRecord, Storage};
use study_core::model::{PlaylistItem, UserId};
use study_core::time::fixed_now;

async fn file_storage(name: &str) -> Storage {
    let path = std::env::temp_dir().join(format!("{name}-{}.sqlite3", std::process::id()));
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{suffix}", path.display()));
    }
    Storage::sqlite(&format!("sqlite://{}?mode=rwc", path.display()))
        .await
        .unwrap()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_toggles_in_one_subject_all_count() {
    let storage = file_storage("study-concurrent-toggles").await;
    let services = AppServices::from_storage(
        &storage,
        Clock::fixed(fixed_now()),
        PlaylistFetcher::new(Arc::new(ScriptedTransport::new())),
        None,
    );
    let study = services.study();
    let progress = services.progress();
    let user = UserId::new(1);

    let exam = study.create_exam(user, "Finals", "").await.unwrap();
    let subject = study.create_subject(exam, "Compilers", 60).await.unwrap();
    let records: Vec<NewVideoRecord> = (0..32_u32)
        .map(|i| {
            let item = PlaylistItem::new(format!("Lecture {i}"), format!("v{i}"), 100);
            NewVideoRecord::from_item(subject, &item, i)
        })
        .collect();
    let ids = storage.videos.insert_videos(&records).await.unwrap();
    progress.set_daily_goal(user, 0.5).await.unwrap();

    let mut handles = Vec::new();
    for &id in &ids {
        let progress = Arc::clone(&progress);
        handles.push(tokio::spawn(async move {
            progress.set_video_watched(user, id, true).await.unwrap()
        }));
    }
    // The same toggle sent again while the first is in flight.
    for _ in 0..4 {
        let progress = Arc::clone(&progress);
        let id = ids[0];
        handles.push(tokio::spawn(async move {
            progress.set_video_watched(user, id, true).await.unwrap()
        }));
    }

    let mut changed = 0;
    let mut crossings = 0;
    for handle in handles {
        let outcome = handle.await.unwrap();
        changed += usize::from(outcome.changed);
        crossings += usize::from(outcome.goal_crossed);
    }
    assert_eq!(changed, 32);
    assert_eq!(crossings, 1);

    assert!((progress.today_minutes(user, subject).await.unwrap() - 53.3).abs() < 1e-9);
    let goal = progress.today_goal(user).await.unwrap();
    assert_eq!(goal.completed_seconds, 3200);
    assert!(goal.achieved);
    assert_eq!(progress.streak(user).await.unwrap().current_streak, 1);

    let overview = study.subject_overview(user, subject).await.unwrap();
    assert_eq!(overview.progress.completed_units, 32);
}
