//! Error types for the DARE client

use thiserror::Error;

/// Errors raised by the DARE client library
#[derive(Error, Debug)]
pub enum DareError {
    #[error("a DARE code has not been found in the url {url}")]
    MalformedResourceUrl { url: String },

    #[error("Unexpected error code {status} and content:\n {body}")]
    RemoteRequestFailed { status: u16, body: String },

    #[error("Response from {url} has no Location header")]
    MissingLocation { url: String },

    #[error("{url} was still not ready after {attempts} polls")]
    PollLimitExceeded { url: String, attempts: u32 },

    #[error("Invalid period: {0}")]
    InvalidPeriod(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, DareError>;
