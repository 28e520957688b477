use std::sync::Arc;

use storage::repository::Storage;

use crate::Clock;
use crate::catalog::{CatalogConfig, PlaylistFetcher};
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::study_service::StudyService;

/// Assembles app-facing services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    study: Arc<StudyService>,
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage and the HTTP catalog client.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        catalog: CatalogConfig,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        let fetcher = PlaylistFetcher::http(catalog.base_url);
        Ok(Self::from_storage(&storage, clock, fetcher, catalog.api_key))
    }

    /// Build services over an already-open storage, e.g. `Storage::in_memory()`.
    #[must_use]
    pub fn from_storage(
        storage: &Storage,
        clock: Clock,
        fetcher: PlaylistFetcher,
        env_api_key: Option<String>,
    ) -> Self {
        let study = StudyService::new(
            clock,
            Arc::clone(&storage.exams),
            Arc::clone(&storage.videos),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.profiles),
            fetcher,
        )
        .with_env_api_key(env_api_key);
        let progress = ProgressService::new(
            clock,
            Arc::clone(&storage.videos),
            Arc::clone(&storage.progress),
            Arc::clone(&storage.profiles),
        );

        Self {
            study: Arc::new(study),
            progress: Arc::new(progress),
        }
    }

    #[must_use]
    pub fn study(&self) -> Arc<StudyService> {
        Arc::clone(&self.study)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}
