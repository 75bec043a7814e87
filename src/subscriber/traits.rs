//! Traits for subscribers and the callbacks they dispatch to

use crate::queue::{
    ChannelIdentifier, ChannelMessageQueue, DeliveryAdapter, ErrorObserver, Payload, QueueResult,
};
use crate::subscriber::error::SubscriberResult;
use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

/// Plain callback invoked with the concrete channel and payload
pub type ChannelHandler = dyn Fn(&ChannelIdentifier, &Payload) + Send + Sync;

/// Options passed through to the server with subscribe/unsubscribe commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum CommandFlags {
    #[default]
    None,
    /// Do not wait for the server to acknowledge
    FireAndForget,
    HighPriority,
    /// Do not follow cluster redirects
    NoRedirect,
}

/// A callback registered with a subscriber
#[derive(Clone)]
pub enum DeliveryCallback {
    Handler(Arc<ChannelHandler>),
    Queue(Arc<DeliveryAdapter>),
}

impl DeliveryCallback {
    pub fn handler<F>(handler: F) -> Self
    where
        F: Fn(&ChannelIdentifier, &Payload) + Send + Sync + 'static,
    {
        DeliveryCallback::Handler(Arc::new(handler))
    }

    /// True when the callback feeds a message queue
    ///
    /// Bulk cleanup uses this to complete queues it removes instead of just
    /// dropping them.
    pub fn is_queue_backed(&self) -> bool {
        matches!(self, DeliveryCallback::Queue(_))
    }

    pub fn as_queue(&self) -> Option<&Arc<DeliveryAdapter>> {
        match self {
            DeliveryCallback::Queue(adapter) => Some(adapter),
            DeliveryCallback::Handler(_) => None,
        }
    }

    /// Identity comparison, used to find a registration again on unsubscribe
    pub fn same_target(&self, other: &DeliveryCallback) -> bool {
        match (self, other) {
            (DeliveryCallback::Handler(a), DeliveryCallback::Handler(b)) => {
                std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
            }
            (DeliveryCallback::Queue(a), DeliveryCallback::Queue(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Hand a raw delivery to the callback
    ///
    /// Queue adapters receive the delivery as is, sentinel included. Plain
    /// handlers never see the sentinel; missing parts are filled from the
    /// subscription channel and an empty payload.
    pub fn deliver(
        &self,
        subscription: &ChannelIdentifier,
        channel: Option<&ChannelIdentifier>,
        payload: Option<&Payload>,
    ) {
        match self {
            DeliveryCallback::Queue(adapter) => adapter.deliver(channel, payload),
            DeliveryCallback::Handler(handler) => {
                if channel.is_none() && payload.is_none() {
                    return;
                }
                let empty = Payload::empty();
                handler(
                    channel.unwrap_or(subscription),
                    payload.unwrap_or(&empty),
                );
            }
        }
    }
}

impl fmt::Debug for DeliveryCallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryCallback::Handler(_) => write!(f, "DeliveryCallback::Handler"),
            DeliveryCallback::Queue(adapter) => {
                f.debug_tuple("DeliveryCallback::Queue").field(adapter).finish()
            }
        }
    }
}

/// The connection-owning side of a pub/sub client
#[async_trait]
pub trait Subscriber: Send + Sync {
    /// Register `callback` for every delivery on `channel`
    fn subscribe(
        &self,
        channel: &ChannelIdentifier,
        callback: DeliveryCallback,
        flags: CommandFlags,
    ) -> SubscriberResult<()>;

    async fn subscribe_async(
        &self,
        channel: &ChannelIdentifier,
        callback: DeliveryCallback,
        flags: CommandFlags,
    ) -> SubscriberResult<()> {
        self.subscribe(channel, callback, flags)
    }

    /// Remove the registration matching `callback` on `channel`
    ///
    /// Returns whether a registration was found.
    fn unsubscribe(
        &self,
        channel: &ChannelIdentifier,
        callback: &DeliveryCallback,
        flags: CommandFlags,
    ) -> SubscriberResult<bool>;

    async fn unsubscribe_async(
        &self,
        channel: &ChannelIdentifier,
        callback: &DeliveryCallback,
        flags: CommandFlags,
    ) -> SubscriberResult<bool> {
        self.unsubscribe(channel, callback, flags)
    }

    /// Observer given to consumer loops of queues created by this subscriber
    fn error_observer(&self) -> Option<Arc<dyn ErrorObserver>> {
        None
    }
}

/// Queue construction for shared subscribers
///
/// Creating a queue registers its delivery adapter exactly once; messages
/// published before this call are not seen by the queue.
#[async_trait]
pub trait SubscriberExt {
    fn subscribe_queue(
        &self,
        channel: ChannelIdentifier,
        flags: CommandFlags,
    ) -> QueueResult<Arc<ChannelMessageQueue>>;

    async fn subscribe_queue_async(
        &self,
        channel: ChannelIdentifier,
        flags: CommandFlags,
    ) -> QueueResult<Arc<ChannelMessageQueue>>;
}

#[async_trait]
impl<S: Subscriber + 'static> SubscriberExt for Arc<S> {
    fn subscribe_queue(
        &self,
        channel: ChannelIdentifier,
        flags: CommandFlags,
    ) -> QueueResult<Arc<ChannelMessageQueue>> {
        let owner: Arc<dyn Subscriber> = self.clone();
        let queue = ChannelMessageQueue::new(channel, owner, self.error_observer());
        queue.subscribe(flags)?;
        Ok(Arc::new(queue))
    }

    async fn subscribe_queue_async(
        &self,
        channel: ChannelIdentifier,
        flags: CommandFlags,
    ) -> QueueResult<Arc<ChannelMessageQueue>> {
        let owner: Arc<dyn Subscriber> = self.clone();
        let queue = ChannelMessageQueue::new(channel, owner, self.error_observer());
        queue.subscribe_async(flags).await?;
        Ok(Arc::new(queue))
    }
}
