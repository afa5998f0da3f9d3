//! Error types for the discovery pipeline.
//!
//! "Not found" is deliberately absent: a missing path is an expected
//! outcome and surfaces as `Ok(None)` from the fetcher. Malformed templates
//! and Bicep content are candidate outcomes, not errors (see
//! [`crate::resolver::CandidateOutcome`]).

use thiserror::Error;

/// Result type alias for pipeline operations.
pub type HarvestResult<T> = Result<T, HarvestError>;

/// Errors that abort a pipeline run or a façade request.
#[derive(Error, Debug)]
pub enum HarvestError {
    /// 401/403 that is not a rate limit: bad token or missing permission.
    #[error("GitHub API {status} on {url}\nHeaders: {headers}\nBody: {body}")]
    Unauthorized {
        url: String,
        status: u16,
        headers: String,
        body: String,
    },

    /// Any other non-success status, including a rate limit that survived
    /// its single retry.
    #[error("GitHub API request failed (HTTP {status}) on {url}: {body}")]
    RemoteApi { url: String, status: u16, body: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("Invalid source: {0}")]
    InvalidSource(String),

    #[error("Invalid limit: {0}")]
    InvalidLimit(String),

    /// Persistence was requested but no store is configured.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    #[error("Storage error: {0}")]
    Storage(#[from] anyhow::Error),
}

impl HarvestError {
    /// Input or configuration errors, as opposed to remote or storage failures.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            HarvestError::InvalidSource(_)
                | HarvestError::InvalidLimit(_)
                | HarvestError::StorageUnavailable(_)
        )
    }
}

/// Truncate a response body for diagnostics.
pub(crate) fn truncate_body(body: &str) -> String {
    body.chars().take(500).collect()
}
