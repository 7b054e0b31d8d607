//! Data-layer error taxonomy.

use taskline_backend::BackendError;
use taskline_core::ValidationError;

/// Errors surfaced by the data-access layer.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// The operation requires an active session and none is held.
    #[error("not authenticated")]
    NotAuthenticated,

    /// The requested row does not exist (or is soft-deleted).
    #[error("{entity} not found")]
    NotFound {
        /// What was looked up, e.g. `"task"`.
        entity: &'static str,
    },

    /// An authenticated identity has no matching profile row.
    #[error("no profile exists for the authenticated user")]
    ProfileMissing,

    /// Input rejected before any request was sent.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// One of the statistics sub-queries failed.
    #[error("statistics collection failed: {0}")]
    Stats(String),

    /// Transport or API failure from the backend client.
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl DataError {
    /// Shorthand for a typed not-found error.
    #[must_use]
    pub fn not_found(entity: &'static str) -> Self {
        Self::NotFound { entity }
    }
}
