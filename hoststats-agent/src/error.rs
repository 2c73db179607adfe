//! Errors of the HTTP collaborators (cAdvisor and orchestrator metadata).
//!
//! These never terminate the reporter: a failed cAdvisor probe switches the
//! cycle to direct disk sampling, and a failed metadata lookup falls back to
//! the local hostname.

use thiserror::Error;

/// Errors from cAdvisor and metadata requests.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request did not complete (connection refused, timeout, ...).
    #[error("Request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The endpoint answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The response body was not what we expected.
    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

/// Result type for collaborator requests.
pub type ClientResult<T> = std::result::Result<T, ClientError>;
