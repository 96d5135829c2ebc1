// Error types for the storefront API client.
// Classifies backend failures into transient (retryable) and terminal outcomes.

use reqwest::StatusCode;
use thiserror::Error;

/// Backend message fragment emitted when the database connection quota is hit.
const CONNECTION_QUOTA_MARKER: &str = "max_connections_per_hour";

/// Backend message fragment emitted when the backend fails to authenticate to its database.
const BACKEND_AUTH_MARKER: &str = "Authentication to";

/// Message shown to end users when the backend is temporarily overloaded.
pub const BUSY_MESSAGE: &str =
    "Server is temporarily busy due to high traffic. Please try again in a few moments.";

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Connection refused: {0}")]
    ConnectionRefused(String),

    #[error("HTTP {status}: {}", .message.as_deref().unwrap_or("no message"))]
    Status {
        status: StatusCode,
        message: Option<String>,
    },

    #[error("Request cancelled")]
    Cancelled,

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Missing {0} environment variable")]
    MissingConfig(&'static str),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, ApiError>;

impl ApiError {
    /// Build a status error from a response code and optional backend message.
    pub fn status(status: StatusCode, message: Option<String>) -> Self {
        ApiError::Status { status, message }
    }

    /// Whether this failure is a temporary backend capacity problem worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ApiError::Status { status, message } => {
                *status == StatusCode::SERVICE_UNAVAILABLE
                    || message.as_deref().is_some_and(|m| {
                        m.contains(CONNECTION_QUOTA_MARKER) || m.contains(BACKEND_AUTH_MARKER)
                    })
            }
            ApiError::ConnectionRefused(_) => true,
            _ => false,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, ApiError::Cancelled)
    }

    pub fn is_unauthorized(&self) -> bool {
        self.http_status() == Some(StatusCode::UNAUTHORIZED)
    }

    /// HTTP status of the failed response, if the backend answered at all.
    pub fn http_status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport(err) => err.status(),
            _ => None,
        }
    }

    /// Message suitable for a toast or inline banner.
    pub fn user_message(&self) -> String {
        if self.is_transient() {
            return BUSY_MESSAGE.to_string();
        }
        match self {
            ApiError::Status {
                message: Some(message),
                ..
            } => message.clone(),
            other => other.to_string(),
        }
    }
}
