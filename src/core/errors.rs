// src/core/errors.rs

use thiserror::Error;

/// Failures talking to the reconnaissance backend.
///
/// All of these are recoverable from the caller's point of view: the poller turns them
/// into a retry, the fetcher into a `FetchOutcome::Failed`.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to backend failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("backend answered {status} for {url}")]
    Status { status: u16, url: String },

    #[error("could not decode response from {url}: {message}")]
    Decode { url: String, message: String },

    #[error("invalid request url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Errors raised when a poll loop cannot be started or joined.
#[derive(Debug, Error)]
pub enum PollError {
    #[error("scan id must not be empty")]
    EmptyScanId,

    #[error("poll task terminated abnormally: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid backend base url: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

#[derive(Debug, Error)]
pub enum ModelError {
    #[error("invalid tool name {0:?}: expected lowercase letters, digits, '_' or '-'")]
    InvalidTool(String),
}

/// Errors that end a watch session before any scan could be observed.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("could not start a new scan: {0}")]
    Create(#[source] ApiError),

    #[error("could not load the scan history: {0}")]
    History(#[source] ApiError),

    #[error("a scope target id is required to start or resume a scan")]
    MissingScopeTarget,

    #[error("no {tool} scans exist for scope target {scope_target_id}")]
    NoScans { scope_target_id: String, tool: String },

    #[error(transparent)]
    Poll(#[from] PollError),
}

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write export file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize export: {0}")]
    Serialize(#[from] serde_json::Error),
}
