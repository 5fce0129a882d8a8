//! Error types for the Runpod API client.

use reqwest::StatusCode;
use thiserror::Error;

/// Reasons a machine id lookup can fail
///
/// Transport errors are stored with their URL stripped, since the request URL carries the
/// API key.
#[derive(Error, Debug)]
pub enum LookupError {
    #[error("request failed: {0}")]
    Request(reqwest::Error),

    #[error("middleware error: {0}")]
    Middleware(anyhow::Error),

    #[error("HTTP Error {}", .0.as_u16())]
    Status(StatusCode),

    #[error("failed to read response body: {0}")]
    Body(reqwest::Error),

    #[error("invalid response JSON at '{}': {}", .0.path(), .0.inner())]
    Decode(serde_path_to_error::Error<serde_json::Error>),

    #[error("invalid response JSON: {0}")]
    TrailingData(serde_json::Error),

    #[error("RUNPOD_POD_ID or RUNPOD_API_KEY is not set")]
    MissingCredentials,
}

impl From<reqwest_middleware::Error> for LookupError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(e) => LookupError::Request(e.without_url()),
            reqwest_middleware::Error::Middleware(e) => LookupError::Middleware(e),
        }
    }
}

impl From<serde_path_to_error::Error<serde_json::Error>> for LookupError {
    fn from(err: serde_path_to_error::Error<serde_json::Error>) -> Self {
        LookupError::Decode(err)
    }
}
