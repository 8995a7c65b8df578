//! Shared error types for the services crate.

use thiserror::Error;

use course_core::NavigationError;
use course_core::model::CurriculumError;
use storage::repository::StorageError;

/// Invalid panel configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum PanelConfigError {
    #[error("storage namespace cannot be empty")]
    EmptyNamespace,
}

/// Durable store could not be read or written.
///
/// The panel never surfaces this to the learner; it switches to in-memory
/// operation instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PersistenceError {
    #[error("persistence unavailable: {0}")]
    Unavailable(#[from] StorageError),
    #[error("failed to encode {key}: {source}")]
    Encode {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors emitted by `PanelController`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PanelError {
    #[error(transparent)]
    Navigation(#[from] NavigationError),
    #[error(transparent)]
    Curriculum(#[from] CurriculumError),
}
