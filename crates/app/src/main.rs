mod args;

use std::fs::File;
use std::io::BufReader;

use services::catalog::CatalogConfig;
use services::{AppServices, Clock, WatchOutcome};
use study_core::duration::format_clock;
use study_core::model::{SubjectId, UserId, Watchable};
use study_core::progress::{minutes_rounded, seconds_to_hours};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use args::{Args, ArgsError, Command, WatchTarget, print_usage};

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let parsed = match Args::parse(std::env::args().skip(1)) {
        Ok(Some(parsed)) => parsed,
        Ok(None) => {
            print_usage();
            return Ok(());
        }
        Err(e) => {
            eprintln!("{e}");
            print_usage();
            return Err(e.into());
        }
    };

    // Open + migrate SQLite here so services only ever see a ready storage.
    prepare_sqlite_file(&parsed.db_url)?;
    let app = AppServices::new_sqlite(&parsed.db_url, Clock::system(), CatalogConfig::from_env())
        .await?;
    let study = app.study();
    let progress = app.progress();
    let user = parsed.user;

    match parsed.command {
        Command::NewExam { name, description } => {
            let id = study.create_exam(user, &name, &description).await?;
            println!("exam {id} created");
        }
        Command::NewSubject {
            exam,
            name,
            goal_minutes,
        } => {
            let id = study.create_subject(exam, &name, goal_minutes).await?;
            println!("subject {id} created");
        }
        Command::SetKey { key } => {
            study.save_api_key(user, &key).await?;
            println!("API key saved");
        }
        Command::SetGoal { hours } => {
            let goal = progress.set_daily_goal(user, hours).await?;
            println!("daily goal set to {:.2} h", goal.goal_hours);
        }
        Command::AddPlaylist { subject, url } => {
            let ids = study.add_playlist(user, subject, &url).await?;
            println!("{} videos added", ids.len());
        }
        Command::AddVideo { subject, url } => {
            let id = study.add_video(user, subject, &url).await?;
            println!("video {id} added");
        }
        Command::ImportCsv { subject, path } => {
            let file = BufReader::new(File::open(&path)?);
            let report = study.import_csv(subject, file).await?;
            println!("{} videos imported", report.created);
            for error in &report.errors {
                eprintln!("  {error}");
            }
        }
        Command::Split { video, minutes } => {
            for chunk in study.split_video(video, minutes).await? {
                println!("{:>6}  {}", chunk.id(), chunk.title());
            }
        }
        Command::Watch { target, watched } => {
            let outcome = match target {
                WatchTarget::Video(id) => progress.set_video_watched(user, id, watched).await?,
                WatchTarget::Chunk(id) => progress.set_chunk_watched(user, id, watched).await?,
            };
            print_outcome(&outcome);
        }
        Command::Focus { subject, minutes } => {
            let outcome = progress
                .record_focus_session(user, subject, u64::from(minutes) * 60)
                .await?;
            print_outcome(&outcome);
        }
        Command::Progress { subject } => {
            let streak = progress.daily_check(user).await?;
            let goal = progress.today_goal(user).await?;
            println!(
                "today: {:.2} / {:.2} h{}",
                seconds_to_hours(goal.completed_seconds),
                goal.goal_hours,
                if goal.achieved { " (achieved)" } else { "" }
            );
            println!(
                "streak: {} (best {})",
                streak.current_streak, streak.best_streak
            );
            if let Some(subject) = subject {
                print_subject(&app, user, subject).await?;
            }
        }
        Command::Analytics => {
            let analytics = study.analytics(user).await?;
            println!(
                "watched in total: {:.1} h",
                seconds_to_hours(analytics.total_watched_seconds)
            );
            for share in &analytics.subjects {
                println!(
                    "  {:>5}  {:>5.1}%  {:>6.1} h  {}",
                    share.subject_id,
                    share.share_percent,
                    seconds_to_hours(share.watched_seconds),
                    share.subject_name
                );
            }
        }
        Command::DeleteExam { exam } => {
            study.delete_exam(user, exam).await?;
            println!("exam {exam} deleted");
        }
        Command::DeleteSubject { subject } => {
            study.delete_subject(user, subject).await?;
            println!("subject {subject} deleted");
        }
        Command::DeletePlaylist { subject } => {
            let removed = study.delete_playlist(user, subject).await?;
            println!("{removed} videos removed from subject {subject}");
        }
    }
    Ok(())
}

async fn print_subject(
    app: &AppServices,
    user: UserId,
    subject: SubjectId,
) -> Result<(), Box<dyn std::error::Error>> {
    let study = app.study();
    let overview = study.subject_overview(user, subject).await?;
    let p = &overview.progress;
    println!(
        "{}: {}/{} units, {:.0} deg, {:.1} h watched, {:.1} h left",
        overview.subject.name(),
        p.completed_units,
        p.total_units,
        p.degrees,
        p.watched_hours(),
        p.remaining_hours()
    );
    println!(
        "today: {:.1} / {} min",
        overview.today_minutes, overview.daily_goal_minutes
    );
    for tracked in study.tracked_videos(subject).await? {
        let video = &tracked.video;
        let mark = if tracked.is_chunked() {
            let done = tracked.chunks.iter().filter(|c| c.is_watched()).count();
            format!("{done}/{}", tracked.chunks.len())
        } else if video.is_watched {
            "x".to_owned()
        } else {
            " ".to_owned()
        };
        println!(
            "  [{mark}] {:>5}  {}  {}",
            video.id,
            format_clock(video.duration_seconds),
            video.title
        );
    }
    Ok(())
}

fn print_outcome(outcome: &WatchOutcome) {
    if !outcome.changed {
        println!("nothing to change");
        return;
    }
    println!("studied today: {:.1} min", minutes_rounded(outcome.today_seconds));
    if outcome.goal_crossed {
        println!(
            "daily goal reached, streak {} (best {})",
            outcome.streak.current_streak, outcome.streak.best_streak
        );
    }
}

fn prepare_sqlite_file(db_url: &str) -> Result<(), Box<dyn std::error::Error>> {
    if db_url == "sqlite::memory:" {
        return Ok(());
    }

    let path = db_url
        .strip_prefix("sqlite://")
        .ok_or_else(|| ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        })?;
    let path = path.split('?').next().unwrap_or(path);
    if path.is_empty() {
        return Err(ArgsError::InvalidDbUrl {
            raw: db_url.to_string(),
        }
        .into());
    }

    let path = std::path::Path::new(path);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    if !path.exists() {
        std::fs::OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)?;
    }
    Ok(())
}

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(err) = run().await {
        tracing::error!("{err}");
        std::process::exit(2);
    }
}
