use reqwest::StatusCode;
use thiserror::Error;

use crate::task::TaskId;

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    #[error("task {0} not found")]
    NotFound(TaskId),

    #[error("invalid response body: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("{0}")]
    Validation(String),

    #[error("no task is selected for editing")]
    NoEditTarget,

    #[error("backend answered with task {returned} for task {requested}")]
    IdMismatch { requested: TaskId, returned: TaskId },
}

impl ClientError {
    /// Transport and server-side failures, as opposed to problems with the
    /// request the client built.
    pub fn is_backend_failure(&self) -> bool {
        match self {
            ClientError::Http(_) | ClientError::Decode(_) | ClientError::IdMismatch { .. } => {
                true
            }
            ClientError::Status { status, .. } => status.is_server_error(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
