//! Session store error taxonomy.

use taskline_data::DataError;

/// Errors surfaced by the session store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Snapshot file I/O failed.
    #[error("session persistence failed: {0}")]
    Persist(#[from] std::io::Error),

    /// Snapshot (de)serialization failed.
    #[error("session snapshot is malformed: {0}")]
    Snapshot(#[from] serde_json::Error),

    /// A data-layer call failed.
    #[error(transparent)]
    Data(#[from] DataError),

    /// The driver task is gone; the store was shut down.
    #[error("session store is closed")]
    Closed,
}
