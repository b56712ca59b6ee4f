use std::time::Duration;

use thiserror::Error;

use crate::domain::Part;

#[derive(Error, Debug)]
pub enum TubeError {
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Upstream call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Upstream returned HTTP {status} for {part}")]
    Status { part: Part, status: u16 },

    #[error("API error\n Fetch:   {part}\n Message: {message}\n Domain:  {domain}\n Reason:  {reason}")]
    Api {
        part: Part,
        domain: String,
        reason: String,
        message: String,
    },

    #[error("{part} not found: {id}")]
    NotFound { part: Part, id: String },

    #[error("Invalid {part} payload: {reason}")]
    Validation { part: Part, reason: String },

    #[error("Refresh cancelled")]
    Cancelled,

    #[error("Invalid feed id: {0}")]
    InvalidFeedId(String),

    #[error("Invalid feed type: {0}")]
    InvalidFeedType(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl TubeError {
    pub fn validation(part: Part, reason: impl Into<String>) -> Self {
        Self::Validation {
            part,
            reason: reason.into(),
        }
    }

    /// Failures talking to upstream that a later request may succeed at.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Timeout(_) | Self::Status { .. }
        )
    }

    /// Upstream answered, but with data that cannot be used. Retrying
    /// without a change upstream fails the same way.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::Validation { .. })
    }
}

pub type Result<T> = std::result::Result<T, TubeError>;
