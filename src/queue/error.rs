//! Queue Error Types

use crate::queue::message::ChannelIdentifier;
use crate::subscriber::SubscriberError;
use std::sync::Arc;

/// Error a queue was completed with, shared by every reader that observes it
pub type CompletionError = Arc<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, thiserror::Error)]
pub enum QueueError {
    #[error("Queue for channel '{channel}' is closed")]
    Closed {
        channel: ChannelIdentifier,
        #[source]
        source: Option<CompletionError>,
    },

    #[error("Read cancelled")]
    Cancelled,

    #[error("A message handler is already registered")]
    AlreadyRegistered,

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Queue is already consumed by {owner}; {attempted} access is not allowed")]
    ConsumerConflict {
        owner: &'static str,
        attempted: &'static str,
    },

    #[error("No tokio runtime available to run the consumer loop")]
    NoRuntime,

    #[error(transparent)]
    Subscriber(#[from] SubscriberError),
}

impl QueueError {
    /// True for the expected terminal condition of a completed queue
    pub fn is_closed(&self) -> bool {
        matches!(self, QueueError::Closed { .. })
    }
}

impl crate::core::error_handling::ContextualError for QueueError {
    fn is_user_actionable(&self) -> bool {
        matches!(
            self,
            QueueError::AlreadyRegistered
                | QueueError::InvalidArgument { .. }
                | QueueError::ConsumerConflict { .. }
        )
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            QueueError::AlreadyRegistered => Some("A message handler is already registered"),
            QueueError::InvalidArgument { message } => Some(message),
            QueueError::ConsumerConflict { .. } => {
                Some("Pull reads and a registered handler cannot share one queue")
            }
            _ => None,
        }
    }
}

/// Result type for queue operations
pub type QueueResult<T> = Result<T, QueueError>;
