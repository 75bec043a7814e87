//! Ordered Per-Subscription Message Queue
//!
//! Decouples the subscriber's delivery thread from application consumers.
//! Each subscription gets its own queue; deliveries are appended in arrival
//! order and handed out exactly once, either to pull readers or to a single
//! background consumer loop.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐
//! │      Subscriber      │  connection / delivery thread
//! └──────────┬───────────┘
//!            │ deliver(channel, payload)
//!            ▼
//! ┌──────────────────────┐
//! │   DeliveryAdapter    │  (null, null) sentinel => complete
//! └──────────┬───────────┘
//!            │ enqueue
//!            ▼
//! ┌─────────────────────────────────────────────┐
//! │          ChannelMessageQueue                │
//! │  ┌───┬───┬───┬───┬───┐                      │
//! │  │ 1 │ 2 │ 3 │ 4 │...│   Active ─► Completed│
//! │  └───┴───┴───┴───┴───┘                      │
//! └───────┬─────────────────────────┬───────────┘
//!         │ read / try_read / stream│ on_message / on_message_async
//!         ▼                         ▼
//! ┌───────────────┐        ┌────────────────────┐
//! │ Pull consumer │   OR   │ Consumer loop task │
//! └───────────────┘        └────────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use subqueue::queue::{ChannelIdentifier, Payload};
//! use subqueue::subscriber::{CommandFlags, InMemorySubscriber, SubscriberExt};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let subscriber = Arc::new(InMemorySubscriber::new());
//! let queue = subscriber.subscribe_queue(ChannelIdentifier::pattern("news.*"), CommandFlags::None)?;
//!
//! queue.on_message(|message| {
//!     println!("{} -> {}", message.channel(), message.payload());
//!     Ok(())
//! })?;
//!
//! subscriber.publish(&ChannelIdentifier::literal("news.tech"), Payload::from("launch"));
//!
//! queue.unsubscribe(None, CommandFlags::None)?;
//! queue.join_consumer().await;
//! # Ok(())
//! # }
//! ```

mod adapter;
mod channel_queue;
mod consumer;
mod error;
mod internal;
mod message;
mod observer;
mod types;

// Public API module - preferred import path for external code
pub mod api;

pub use adapter::DeliveryAdapter;
pub use channel_queue::ChannelMessageQueue;
pub use consumer::{HandlerError, HandlerResult, MessageHandler};
pub use error::{CompletionError, QueueError, QueueResult};
pub use internal::CompletionSignal;
pub use message::{ChannelIdentifier, ChannelKind, Message, Payload};
pub use observer::{ErrorObserver, LoggingErrorObserver};
pub use types::{ConsumerMode, StatisticsSnapshot};

#[cfg(test)]
mod tests;
