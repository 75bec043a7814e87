//! Error observer for infrastructure faults in consumer loops
//!
//! Only faults raised by the loop's own read step reach the observer. Faults
//! raised by user handlers are swallowed by the loop and never reported here.

use crate::queue::error::QueueError;
use crate::queue::message::ChannelIdentifier;

/// Sink for internal errors, injected by the subscriber that creates a queue
pub trait ErrorObserver: Send + Sync {
    fn on_internal_error(&self, channel: &ChannelIdentifier, error: &QueueError);
}

/// Observer that reports internal errors through the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingErrorObserver;

impl ErrorObserver for LoggingErrorObserver {
    fn on_internal_error(&self, channel: &ChannelIdentifier, error: &QueueError) {
        log::error!("Consumer loop for channel '{}' stopped: {}", channel, error);
        log::debug!("DEBUG_DETAILS: {:?}", error);
    }
}
