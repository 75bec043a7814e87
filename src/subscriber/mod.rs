//! Subscriber side of the pub/sub client
//!
//! A [`Subscriber`] owns the server connection and dispatches every incoming
//! delivery to the callbacks registered for a channel or pattern. Callbacks
//! are either ordinary closures or the delivery adapter of a
//! [`ChannelMessageQueue`](crate::queue::ChannelMessageQueue), created through
//! [`SubscriberExt::subscribe_queue`].
//!
//! [`InMemorySubscriber`] is a process-local implementation used by the
//! `subqueue` pump and by tests.

mod error;
mod memory;
mod traits;

pub use error::{SubscriberError, SubscriberResult};
pub use memory::InMemorySubscriber;
pub use traits::{ChannelHandler, CommandFlags, DeliveryCallback, Subscriber, SubscriberExt};

#[cfg(test)]
mod tests;
