//! Error handling for catalog API operations.

use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single request attempt.
///
/// Every variant is treated as transient by the retry loop.
#[derive(Debug, Error)]
pub enum RequestError {
    #[error("request could not be sent")]
    Transport(#[source] reqwest::Error),
    #[error("server responded with status {0}")]
    Status(StatusCode),
    #[error("response body is not valid JSON")]
    MalformedBody(#[source] serde_json::Error),
    #[error("response has no 'result' field")]
    MissingResult,
}

/// Common error type for catalog API operations.
#[derive(Debug, Error)]
pub enum CatalogClientError {
    /// The retry budget was used up without a successful response.
    #[error("catalog unavailable: '{action}' failed after {attempts} attempt(s)")]
    Unavailable {
        action: String,
        attempts: u32,
        #[source]
        last_error: RequestError,
    },
    /// The request succeeded but `result` has an unexpected shape.
    #[error("unexpected result for '{action}'")]
    UnexpectedResult {
        action: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid request parameters: {0}")]
    InvalidParams(String),
    #[error("{0}")]
    Other(String),
}

impl CatalogClientError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, CatalogClientError::Unavailable { .. })
    }
}
