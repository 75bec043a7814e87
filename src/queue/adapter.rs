//! Delivery adapter bridging raw subscriber deliveries into a queue
//!
//! The subscriber calls [`DeliveryAdapter::deliver`] from whatever thread
//! its connection delivers on. The call only appends to the queue buffer:
//! it never waits for a consumer and never fails.

use crate::queue::error::CompletionError;
use crate::queue::internal::MessageBuffer;
use crate::queue::message::{ChannelIdentifier, Message, Payload};
use std::fmt;
use std::sync::Arc;

/// The delivery callback of a queue-backed subscription
///
/// Subscribers receive it wrapped in
/// [`DeliveryCallback::Queue`](crate::subscriber::DeliveryCallback::Queue),
/// which lets them tell queue-backed registrations apart from ordinary
/// callbacks during bulk cleanup.
pub struct DeliveryAdapter {
    buffer: Arc<MessageBuffer>,
}

impl DeliveryAdapter {
    pub(crate) fn new(buffer: Arc<MessageBuffer>) -> Self {
        Self { buffer }
    }

    /// The channel or pattern the owning queue subscribed to
    pub fn channel(&self) -> &ChannelIdentifier {
        self.buffer.channel()
    }

    /// Accept a raw delivery
    ///
    /// A delivery with neither channel nor payload is the shutdown sentinel
    /// and completes the queue. A missing channel falls back to the
    /// subscription channel; a missing payload becomes an empty payload.
    pub fn deliver(&self, channel: Option<&ChannelIdentifier>, payload: Option<&Payload>) {
        if channel.is_none() && payload.is_none() {
            log::trace!(
                "Shutdown sentinel received for channel '{}'",
                self.buffer.channel()
            );
            self.buffer.complete(None);
            return;
        }

        let message = Message::delivered(
            self.buffer.channel_ref(),
            channel.cloned().unwrap_or_else(|| self.buffer.channel().clone()),
            payload.cloned().unwrap_or_default(),
        );
        if !self.buffer.enqueue(message) {
            log::trace!(
                "Dropped delivery for completed queue on channel '{}'",
                self.buffer.channel()
            );
        }
    }

    /// Complete the owning queue on behalf of the subscriber
    pub fn mark_completed(&self, error: Option<CompletionError>) {
        self.buffer.complete(error);
    }

    pub fn is_completed(&self) -> bool {
        self.buffer.is_completed()
    }
}

impl fmt::Debug for DeliveryAdapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeliveryAdapter")
            .field("channel", self.buffer.channel())
            .field("completed", &self.buffer.is_completed())
            .finish()
    }
}
