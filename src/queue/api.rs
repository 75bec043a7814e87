//! Public API for the queue system
//!
//! External modules should import from here rather than directly from
//! internal modules. See the module documentation for the architecture.

// Core queue components
pub use crate::queue::adapter::DeliveryAdapter;
pub use crate::queue::channel_queue::ChannelMessageQueue;
pub use crate::queue::internal::CompletionSignal;

// Message types
pub use crate::queue::message::{ChannelIdentifier, ChannelKind, Message, Payload};

// Handlers and the consumer loop
pub use crate::queue::consumer::{HandlerError, HandlerResult, MessageHandler};
pub use crate::queue::observer::{ErrorObserver, LoggingErrorObserver};

// Error handling
pub use crate::queue::error::{CompletionError, QueueError, QueueResult};

// Statistics and consumption mode
pub use crate::queue::types::{ConsumerMode, StatisticsSnapshot};
