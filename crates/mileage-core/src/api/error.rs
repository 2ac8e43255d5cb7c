use std::time::Duration;

use thiserror::Error;

/// Failure of a single candidate attempt. Never terminal on its own: the
/// dispatcher moves on to the next candidate or encoding.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AttemptError {
    #[error("Request timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    #[error("{status}{}", body_suffix(.body))]
    Status { status: u16, body: String },

    #[error("Network error: {0}")]
    Network(String),
}

fn body_suffix(body: &str) -> String {
    if body.is_empty() {
        String::new()
    } else {
        format!(" - {}", body)
    }
}

/// Maximum length for error response bodies in error messages
const MAX_ERROR_BODY_LENGTH: usize = 200;

impl AttemptError {
    /// Truncate a response body to avoid logging excessive data
    fn truncate_body(body: &str) -> String {
        if body.len() <= MAX_ERROR_BODY_LENGTH {
            body.to_string()
        } else {
            let mut end = MAX_ERROR_BODY_LENGTH;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            format!("{}... (truncated, {} total bytes)", &body[..end], body.len())
        }
    }

    pub fn from_status(status: u16, body: &str) -> Self {
        AttemptError::Status {
            status,
            body: Self::truncate_body(body.trim()),
        }
    }
}

impl From<reqwest::Error> for AttemptError {
    fn from(e: reqwest::Error) -> Self {
        AttemptError::Network(e.to_string())
    }
}

/// Errors surfaced to the presentation layer.
///
/// Cache failures never appear here; they degrade to cache misses.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SyncError {
    #[error("{0}")]
    Validation(String),

    #[error("All endpoint styles failed for op=\"{operation}\". Last error: {last}")]
    Transport {
        operation: String,
        last: AttemptError,
    },

    #[error("{operation}: {message}")]
    Application { operation: String, message: String },

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    pub fn validation(message: impl Into<String>) -> Self {
        SyncError::Validation(message.into())
    }

    /// True for failures of the remote service, as opposed to bad input or setup.
    pub fn is_remote(&self) -> bool {
        matches!(self, SyncError::Transport { .. } | SyncError::Application { .. })
    }
}
