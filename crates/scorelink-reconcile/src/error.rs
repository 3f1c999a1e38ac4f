//! Error types for the reconciliation engine

use thiserror::Error;

/// Errors that abort a reconciliation
///
/// Any error leaves the store exactly as it was before the attempt: the
/// transaction is dropped without committing.
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// Reading the current records failed
    #[error("failed to read local {collection}: {source}")]
    Fetch {
        collection: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// An insert, update or delete failed
    #[error("failed to write local {collection}: {source}")]
    Write {
        collection: &'static str,
        #[source]
        source: anyhow::Error,
    },

    /// The transaction could not be committed
    #[error("commit failed: {0}")]
    Commit(#[source] anyhow::Error),
}

impl ReconcileError {
    pub(crate) fn fetch(collection: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| ReconcileError::Fetch { collection, source }
    }

    pub(crate) fn write(collection: &'static str) -> impl FnOnce(anyhow::Error) -> Self {
        move |source| ReconcileError::Write { collection, source }
    }
}
