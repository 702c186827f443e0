use reqwest::StatusCode;
use thiserror::Error;

/// Raised while wiring up a controller, before any submission is possible.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("session mode requires a session identifier")]
    MissingSessionId,
    #[error("invalid api url '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },
    #[error("invalid simulated delay bounds: min {min_ms}ms exceeds max {max_ms}ms")]
    InvalidDelayBounds { min_ms: u64, max_ms: u64 },
    #[error("unknown provider mode '{0}' (expected simulated, history or session)")]
    UnknownMode(String),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
}

/// Failure of a single outbound reply call.
#[derive(Debug, Error)]
pub enum ReplyError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },
    #[error("malformed reply body: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum SubmitError {
    #[error("a reply is already pending")]
    Busy,
    #[error(transparent)]
    Reply(#[from] ReplyError),
}
