#![forbid(unsafe_code)]

pub mod app_services;
pub mod catalog;
pub mod csv_import;
pub mod error;
pub mod progress_service;
pub mod study_service;

pub use study_core::Clock;

pub use app_services::AppServices;
pub use catalog::{CatalogConfig, PlaylistFetcher};
pub use csv_import::ImportReport;
pub use error::{
    AppServicesError, FetchError, ImportError, ProgressServiceError, StudyServiceError,
};
pub use progress_service::{ProgressService, WatchOutcome};
pub use study_service::{StudyAnalytics, StudyService, SubjectOverview, SubjectShare};
