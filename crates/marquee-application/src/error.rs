// SPDX-License-Identifier: GPL-3.0-or-later
use thiserror::Error;

/// Failures reported by the external search/grab/read-model collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("conflict: {0}")]
    Conflict(String),
    #[error("request failed: {0}")]
    Request(String),
    #[error("backend responded with status {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("deserialization failed: {0}")]
    Deserialization(String),
}

impl ServiceError {
    /// Whether the failure means the item is already queued or downloading.
    pub fn is_conflict(&self) -> bool {
        match self {
            Self::Conflict(_) => true,
            Self::HttpStatus { status: 409, .. } => true,
            other => is_conflict_message(&other.to_string()),
        }
    }
}

/// Backends phrase duplicate-grab rejections in several ways; all of them are benign.
pub fn is_conflict_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("conflict")
        || message.contains("already in queue")
        || message.contains("already queued")
        || message.contains("already downloading")
        || message.contains("409")
}

pub type ServiceResult<T> = Result<T, ServiceError>;
