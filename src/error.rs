use thiserror::Error;

use crate::gateway::{DeleteFailure, GatewayError};

/// Provider-side failures of a decommissioning session.
///
/// All of them are recoverable: the session reports them and falls back to
/// bucket selection (or ends, when not even the bucket list is available).
#[derive(Debug, Error)]
pub enum DecomError {
    #[error("Could not list buckets: {0}")]
    ListBuckets(#[source] GatewayError),

    #[error("Could not inspect bucket `{bucket}`: {source}")]
    Query {
        bucket: String,
        #[source]
        source: GatewayError,
    },

    #[error("Could not enumerate the contents of `{bucket}`: {source}")]
    Enumeration {
        bucket: String,
        #[source]
        source: GatewayError,
    },

    #[error("Bulk delete of {submitted} objects in `{bucket}` was rejected: {source}")]
    BatchRejected {
        bucket: String,
        submitted: usize,
        #[source]
        source: GatewayError,
    },

    #[error("Bulk delete in `{bucket}` left {failed} of {submitted} objects behind, first: {first}")]
    BatchIncomplete {
        bucket: String,
        submitted: usize,
        failed: usize,
        first: DeleteFailure,
    },

    #[error("Could not delete bucket `{bucket}`: {source}")]
    BucketDelete {
        bucket: String,
        #[source]
        source: GatewayError,
    },
}

/// Malformed bucket selection; answered with a new prompt, never surfaced as a failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionError {
    #[error("Please enter a valid number (got `{0}`).")]
    NotANumber(String),

    #[error("Invalid selection {index}, pick a number between 1 and {count}.")]
    OutOfRange { index: usize, count: usize },
}
