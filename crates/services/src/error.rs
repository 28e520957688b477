//! Shared error types for the services crate.

use thiserror::Error;

use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;
use study_core::chunking::ChunkError;
use study_core::model::ModelError;

/// Terminal failures of a catalog fetch. Nothing is retried and no partial result is
/// returned.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    #[error("not a recognised catalog URL: {0}")]
    InvalidUrl(String),
    #[error("no catalog API key is configured")]
    MissingApiKey,
    #[error("catalog API rejected the API key")]
    Auth,
    #[error("catalog API quota exceeded")]
    QuotaExceeded,
    #[error("catalog API error: {0}")]
    Api(String),
    #[error("catalog request failed: {0}")]
    Network(String),
    #[error("video not found in catalog")]
    NotFound,
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Errors emitted while reading a CSV of videos.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ImportError {
    #[error("missing required column: title")]
    MissingTitleColumn,
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Errors emitted by `StudyService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StudyServiceError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Chunk(#[from] ChunkError),
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Import(#[from] ImportError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressService`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressServiceError {
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping app services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AppServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
