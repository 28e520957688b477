use chrono::Utc;
use sqlx::SqlitePool;

use super::SqliteInitError;

const SCHEMA_V1: &[&str] = &[
    r"
        CREATE TABLE IF NOT EXISTS exams (
            id INTEGER PRIMARY KEY,
            user_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            description TEXT NOT NULL DEFAULT '',
            created_at TEXT NOT NULL
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS subjects (
            id INTEGER PRIMARY KEY,
            exam_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            daily_goal_minutes INTEGER NOT NULL DEFAULT 0 CHECK (daily_goal_minutes >= 0),
            FOREIGN KEY (exam_id) REFERENCES exams(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS videos (
            id INTEGER PRIMARY KEY,
            subject_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            external_id TEXT NOT NULL,
            url TEXT NOT NULL,
            duration_seconds INTEGER NOT NULL CHECK (duration_seconds >= 0),
            is_watched INTEGER NOT NULL DEFAULT 0 CHECK (is_watched IN (0, 1)),
            position INTEGER NOT NULL CHECK (position >= 0),
            FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS video_chunks (
            id INTEGER PRIMARY KEY,
            video_id INTEGER NOT NULL,
            chunk_index INTEGER NOT NULL CHECK (chunk_index >= 1),
            start_seconds INTEGER NOT NULL CHECK (start_seconds >= 0),
            end_seconds INTEGER NOT NULL CHECK (end_seconds > start_seconds),
            title TEXT NOT NULL,
            is_watched INTEGER NOT NULL DEFAULT 0 CHECK (is_watched IN (0, 1)),
            UNIQUE (video_id, chunk_index),
            FOREIGN KEY (video_id) REFERENCES videos(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS daily_logs (
            user_id INTEGER NOT NULL,
            subject_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            seconds_watched INTEGER NOT NULL CHECK (seconds_watched >= 0),
            PRIMARY KEY (user_id, subject_id, date),
            FOREIGN KEY (subject_id) REFERENCES subjects(id) ON DELETE CASCADE
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS daily_goals (
            user_id INTEGER NOT NULL,
            date TEXT NOT NULL,
            goal_hours REAL NOT NULL CHECK (goal_hours >= 0),
            completed_seconds INTEGER NOT NULL CHECK (completed_seconds >= 0),
            achieved INTEGER NOT NULL CHECK (achieved IN (0, 1)),
            PRIMARY KEY (user_id, date)
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS streaks (
            user_id INTEGER PRIMARY KEY,
            current_streak INTEGER NOT NULL CHECK (current_streak >= 0),
            best_streak INTEGER NOT NULL CHECK (best_streak >= 0),
            last_achieved_on TEXT
        );
    ",
    r"
        CREATE TABLE IF NOT EXISTS user_profiles (
            user_id INTEGER PRIMARY KEY,
            catalog_api_key TEXT,
            default_goal_hours REAL NOT NULL DEFAULT 0 CHECK (default_goal_hours >= 0)
        );
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_videos_subject_position
            ON videos (subject_id, position, id);
    ",
    r"
        CREATE INDEX IF NOT EXISTS idx_exams_user
            ON exams (user_id, id);
    ",
];

/// Runs the schema migrations that have not been applied yet.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), SqliteInitError> {
    async fn is_applied(pool: &SqlitePool, version: i64) -> Result<bool, sqlx::Error> {
        let row = sqlx::query("SELECT 1 FROM schema_migrations WHERE version = ?1")
            .bind(version)
            .fetch_optional(pool)
            .await?;
        Ok(row.is_some())
    }

    sqlx::query(
        r"
            CREATE TABLE IF NOT EXISTS schema_migrations (
                version INTEGER PRIMARY KEY,
                applied_at TEXT NOT NULL
            );
            ",
    )
    .execute(pool)
    .await?;

    // Version 1: catalog, progress and profile tables.
    if !is_applied(pool, 1).await? {
        let mut tx = pool.begin().await?;

        for statement in SCHEMA_V1 {
            sqlx::query(*statement).execute(&mut *tx).await?;
        }

        sqlx::query(
            r"
                INSERT INTO schema_migrations (version, applied_at)
                VALUES (?1, ?2)
                ON CONFLICT(version) DO NOTHING
            ",
        )
        .bind(1_i64)
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        tracing::info!(version = 1, "applied schema migration");
    }

    Ok(())
}
