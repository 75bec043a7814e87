//! Test modules for the queue system
//!
//! Tests are organized by functional area; every queue is created through an
//! in-memory subscriber, the same way applications create them.

mod edge_cases;
mod lifecycle;

use crate::queue::{ChannelIdentifier, ChannelMessageQueue};
use crate::subscriber::{CommandFlags, InMemorySubscriber, SubscriberExt};
use std::sync::Arc;

/// Subscriber plus a queue subscribed to the literal channel `name`
pub(crate) fn literal_queue(
    name: &'static str,
) -> (Arc<InMemorySubscriber>, Arc<ChannelMessageQueue>) {
    let subscriber = Arc::new(InMemorySubscriber::new());
    let queue = subscriber
        .subscribe_queue(ChannelIdentifier::literal(name), CommandFlags::None)
        .expect("subscribe should succeed");
    (subscriber, queue)
}
