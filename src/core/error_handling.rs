//! Generic error handling utilities
//!
//! Queue, subscriber and configuration errors share one reporting path: the
//! pump logs a single `FATAL` line and keeps the full error for debug output.

/// Errors that know whether their message is meant for the user
///
/// When `is_user_actionable()` returns `true`, `user_message()` should return
/// `Some(message)`; otherwise it should return `None`.
pub trait ContextualError: std::error::Error {
    /// True for misuse the caller can fix, such as registering a second
    /// handler or pointing `--config` at a missing file
    fn is_user_actionable(&self) -> bool;

    /// The message to show for user-actionable errors
    fn user_message(&self) -> Option<&str>;
}

/// Log an error with a level of detail that matches its kind
///
/// User-actionable errors log their own message; everything else logs the
/// operation context. The full error is always available at debug level.
///
/// # Examples
/// ```rust,no_run
/// # use subqueue::core::error_handling::log_error_with_context;
/// # use subqueue::queue::QueueError;
/// log_error_with_context(&QueueError::AlreadyRegistered, "Starting consumer");
/// // Logs: "FATAL: A message handler is already registered"
///
/// log_error_with_context(&QueueError::NoRuntime, "Starting consumer");
/// // Logs: "FATAL: Starting consumer"
/// ```
pub fn log_error_with_context<E: ContextualError + std::fmt::Display + std::fmt::Debug>(
    error: &E,
    operation_context: &str,
) {
    let headline = if error.is_user_actionable() {
        error.user_message().unwrap_or(operation_context)
    } else {
        operation_context
    };
    log::error!("FATAL: {}", headline);
    log::debug!("DETAIL: {}", error);
    log::debug!("DEBUG_DETAILS: {:?}", error);
}
