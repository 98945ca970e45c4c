use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DialogueError {
    #[error("No response generated from the AI model")]
    NoResponseGenerated,

    #[error("Completion timed out after {0:?}")]
    CompletionTimeout(Duration),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Upstream failure: {0}")]
    UpstreamFailure(String),

    #[error("Store failure: {0}")]
    StoreFailure(String),
}

impl DialogueError {
    /// Whether the caller is allowed to see this error's message verbatim.
    pub fn is_client_error(&self) -> bool {
        matches!(self, DialogueError::InvalidArgument(_))
    }
}

pub type Result<T> = std::result::Result<T, DialogueError>;
