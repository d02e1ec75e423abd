use std::time::Duration;
use thiserror::Error;

use crate::api::ApiError;

#[derive(Debug, Error)]
pub enum AttachmentError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{kind} {id} not found")]
    NotFound { kind: &'static str, id: String },

    #[error("network element {element_id} is already mapped to {kind} {parent_id}")]
    AlreadyAttached {
        kind: &'static str,
        parent_id: String,
        element_id: String,
    },

    /// The write went through but was not observed before the deadline.
    #[error(
        "timed out after {timeout:?} waiting for network element {element_id} to appear on {kind} {parent_id}"
    )]
    ConvergenceTimeout {
        kind: &'static str,
        parent_id: String,
        element_id: String,
        timeout: Duration,
    },

    #[error("{kind} {parent_id} stayed busy for {timeout:?}: {message}")]
    ResourceBusy {
        kind: &'static str,
        parent_id: String,
        message: String,
        timeout: Duration,
    },

    #[error("malformed attachment id: {0}")]
    MalformedIdentifier(String),

    #[error(transparent)]
    Transport(ApiError),
}

impl AttachmentError {
    /// Lift an API error, giving `NotFound` the parent it refers to.
    pub(crate) fn from_api(kind: &'static str, parent_id: &str, err: ApiError) -> Self {
        match err {
            ApiError::NotFound { .. } => AttachmentError::NotFound {
                kind,
                id: parent_id.to_string(),
            },
            other => AttachmentError::Transport(other),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, AttachmentError::NotFound { .. })
    }
}
