use std::sync::Arc;
use std::time::Duration;

use sqlx::{Sqlite, SqlitePool, Transaction, sqlite::SqlitePoolOptions};
use thiserror::Error;

use crate::repository::{
    ExamRepository, ProfileRepository, ProgressRepository, Storage, StorageError, VideoRepository,
};

mod exam_repo;
mod mapping;
mod migrate;
mod profile_repo;
mod progress_repo;
mod video_repo;

#[derive(Clone)]
pub struct SqliteRepository {
    pool: SqlitePool,
}

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SqliteInitError {
    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl SqliteRepository {
    /// Connect to `SQLite` using the given URL.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if the connection cannot be established or if
    /// the connection pragmas fail.
    pub async fn connect(database_url: &str) -> Result<Self, SqliteInitError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(5))
            .after_connect(|conn, _meta| {
                Box::pin(async move {
                    sqlx::query("PRAGMA foreign_keys = ON;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA journal_mode = WAL;")
                        .execute(&mut *conn)
                        .await?;
                    sqlx::query("PRAGMA busy_timeout = 5000;")
                        .execute(&mut *conn)
                        .await?;
                    Ok(())
                })
            })
            .connect(database_url)
            .await?;
        tracing::debug!(database_url, "connected to sqlite");
        Ok(Self { pool })
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Create tables if they do not exist.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if migration queries fail.
    pub async fn migrate(&self) -> Result<(), SqliteInitError> {
        migrate::run_migrations(&self.pool).await
    }

    /// Start a transaction that takes the write lock before its first read.
    ///
    /// Progress updates read a goal or streak, apply the pure update and write it back.
    /// With a deferred `BEGIN` two writers could both read the old row; `IMMEDIATE`
    /// makes the second one wait on `busy_timeout` until the first commits.
    pub(crate) async fn begin_immediate(
        &self,
    ) -> Result<Transaction<'static, Sqlite>, StorageError> {
        self.pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(mapping::conn)
    }

    /// Run a statement that flips a boolean column only when it differs from the
    /// requested value. `Ok(false)` means the row exists but already had it.
    pub(crate) async fn flip_flag(
        &self,
        table: &'static str,
        id: i64,
        value: bool,
    ) -> Result<bool, StorageError> {
        let sql = format!("UPDATE {table} SET is_watched = ?1 WHERE id = ?2 AND is_watched <> ?1");
        let res = sqlx::query(&sql)
            .bind(i64::from(value))
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(mapping::conn)?;
        if res.rows_affected() == 1 {
            return Ok(true);
        }

        let exists_sql = format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)");
        let exists: i64 = sqlx::query_scalar(&exists_sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map_err(mapping::conn)?;
        if exists != 0 {
            Ok(false)
        } else {
            Err(StorageError::NotFound)
        }
    }
}

impl Storage {
    /// Build a `Storage` backed by `SQLite`.
    ///
    /// # Errors
    ///
    /// Returns `SqliteInitError` if connection or migrations cannot be
    /// completed.
    pub async fn sqlite(database_url: &str) -> Result<Self, SqliteInitError> {
        let repo = SqliteRepository::connect(database_url).await?;
        repo.migrate().await?;
        let exams: Arc<dyn ExamRepository> = Arc::new(repo.clone());
        let videos: Arc<dyn VideoRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo.clone());
        let profiles: Arc<dyn ProfileRepository> = Arc::new(repo);
        Ok(Self {
            exams,
            videos,
            progress,
            profiles,
        })
    }
}
