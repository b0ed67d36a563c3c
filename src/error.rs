use thiserror::Error;

/// Failures raised while building a holder activity report.
///
/// Whether a variant is fatal depends on where it surfaces: at the snapshot
/// level every variant aborts the run, inside a per-account scan it only ends
/// that account's scan.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AggregationError {
    #[error("Invalid range: {0}")]
    InvalidRange(String),

    #[error("Upstream error: {0}")]
    UpstreamError(String),

    #[error("Malformed record: {0}")]
    MalformedRecord(String),

    #[error("Pagination loop detected on {stream}: token '{token}' was already consumed")]
    PaginationLoopDetected { stream: String, token: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl From<reqwest::Error> for AggregationError {
    fn from(err: reqwest::Error) -> Self {
        AggregationError::UpstreamError(err.to_string())
    }
}

pub type AggregationResult<T> = Result<T, AggregationError>;
