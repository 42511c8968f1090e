//! Northbound client errors

use thiserror::Error;

/// Errors that can occur when talking to the northbound gateway
#[derive(Debug, Error)]
pub enum OvnError {
    /// HTTP request/response error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The gateway returned an error
    #[error("northbound API error: {0}")]
    Api(String),

    /// JSON serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Object not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Invalid request (e.g., missing required fields)
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}
