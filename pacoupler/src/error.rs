//! Cycle-level error types
//!
//! A `SyncError` aborts the current sync cycle. Failures that only affect
//! one template, one test run or one page object never surface here; the
//! pipeline records them in its `SyncReport` and carries on.

use pacoupler_client::ClientError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    /// The PA token exchange failed
    #[error("couldn't authenticate to the PA API: {0}")]
    Authentication(#[source] ClientError),

    /// A listing the whole cycle depends on failed
    #[error("failed to list {what} from the PA API: {source}")]
    ApiQuery {
        what: &'static str,
        #[source]
        source: ClientError,
    },

    /// Reading the latest indexed test run failed
    #[error("failed to read the sync watermark from the index: {0}")]
    Watermark(#[source] ClientError),

    /// Writing a document failed
    #[error("failed to index {id}: {source}")]
    Index {
        id: String,
        #[source]
        source: ClientError,
    },
}
