//! Error types for the deployment runner

use std::time::Duration;

use thiserror::Error;

/// Main error type for the deployment runner
#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] url::ParseError),

    /// Request failed, or the response was non-OK or unparsable
    #[error("{context} (status: {}): {body}", display_status(.status))]
    Transport {
        context: String,
        status: Option<u16>,
        body: String,
    },

    /// A write succeeded but the read-back does not match what was written
    #[error("Verification failed for {field}: expected {expected}, got {actual}")]
    Verification {
        field: String,
        expected: String,
        actual: String,
    },

    #[error("{operation} timed out after {elapsed:?}")]
    Timeout { operation: String, elapsed: Duration },

    #[error("Deployment failed at stage \"{stage}\" with status \"{status}\": {dashboard_url}")]
    DeploymentFailed {
        stage: String,
        status: String,
        dashboard_url: String,
    },

    #[error("Precondition failed: {0}")]
    Precondition(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Mutex error: {0}")]
    MutexError(String),

    #[error("Shell error: {0}")]
    ShellError(String),

    #[error("Cancelled: {0}")]
    Cancelled(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RunnerError {
    /// Build a transport error for a request that never produced a response
    pub fn request_failed(context: impl Into<String>, err: impl std::fmt::Display) -> Self {
        RunnerError::Transport {
            context: context.into(),
            status: None,
            body: err.to_string(),
        }
    }

    /// Whether the error came from the transport layer
    pub fn is_transient(&self) -> bool {
        matches!(self, RunnerError::Transport { .. } | RunnerError::HttpError(_))
    }
}

fn display_status(status: &Option<u16>) -> String {
    match status {
        Some(status) => status.to_string(),
        None => "none".to_string(),
    }
}
