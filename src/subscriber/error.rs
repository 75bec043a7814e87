//! Error types for subscribers

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SubscriberError {
    #[error("Subscriber connection is closed")]
    Closed,

    #[error("Invalid channel pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Subscribe to '{channel}' failed: {message}")]
    SubscribeFailed { channel: String, message: String },

    #[error("Unsubscribe from '{channel}' failed: {message}")]
    UnsubscribeFailed { channel: String, message: String },
}

impl crate::core::error_handling::ContextualError for SubscriberError {
    fn is_user_actionable(&self) -> bool {
        matches!(self, SubscriberError::InvalidPattern { .. })
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            SubscriberError::InvalidPattern { message, .. } => Some(message),
            _ => None,
        }
    }
}

pub type SubscriberResult<T> = Result<T, SubscriberError>;
