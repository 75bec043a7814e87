//! ChannelMessageQueue - ordered delivery queue for one subscription
//!
//! A `ChannelMessageQueue` is created by a [`Subscriber`] (see
//! [`SubscriberExt::subscribe_queue`](crate::subscriber::SubscriberExt::subscribe_queue))
//! and receives every message delivered to its channel or pattern, in order.
//! Messages are consumed in exactly one of two ways:
//!
//! - **Pull**: [`read`](ChannelMessageQueue::read),
//!   [`try_read`](ChannelMessageQueue::try_read) and
//!   [`stream`](ChannelMessageQueue::stream) for callers that pump messages
//!   themselves
//! - **Handler**: [`on_message`](ChannelMessageQueue::on_message) or
//!   [`on_message_async`](ChannelMessageQueue::on_message_async), which start
//!   a single background consumer loop
//!
//! Whichever is used first owns the queue for its lifetime; the other fails
//! with [`QueueError::ConsumerConflict`].
//!
//! Unsubscribing detaches the queue from its subscriber and then completes
//! it. Completion happens even when detaching fails, so every consumer
//! observes the end of the stream.

use crate::core::sync::lock_or_recover;
use crate::queue::adapter::DeliveryAdapter;
use crate::queue::consumer::{spawn_consumer_loop, HandlerResult, MessageHandler};
use crate::queue::error::{CompletionError, QueueError, QueueResult};
use crate::queue::internal::{CompletionSignal, MessageBuffer};
use crate::queue::message::{ChannelIdentifier, Message};
use crate::queue::observer::ErrorObserver;
use crate::queue::types::{ConsumerMode, ConsumerModeCell, StatisticsSnapshot};
use crate::subscriber::{CommandFlags, DeliveryCallback, Subscriber};
use futures::Stream;
use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Per-subscription message queue
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use subqueue::queue::ChannelIdentifier;
/// use subqueue::subscriber::{CommandFlags, InMemorySubscriber, SubscriberExt};
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let subscriber = Arc::new(InMemorySubscriber::new());
/// let queue = subscriber.subscribe_queue(ChannelIdentifier::literal("news"), CommandFlags::None)?;
///
/// subscriber.publish(&ChannelIdentifier::literal("news"), "hello".into());
///
/// let message = queue.read(&CancellationToken::new()).await?;
/// println!("Received: {}", message);
///
/// queue.unsubscribe(None, CommandFlags::None)?;
/// # Ok(())
/// # }
/// ```
pub struct ChannelMessageQueue {
    buffer: Arc<MessageBuffer>,
    adapter: Arc<DeliveryAdapter>,
    owner: Mutex<Option<Arc<dyn Subscriber>>>,
    observer: Option<Arc<dyn ErrorObserver>>,
    mode: ConsumerModeCell,
    consumer: Mutex<Option<JoinHandle<()>>>,
}

impl ChannelMessageQueue {
    pub(crate) fn new(
        channel: ChannelIdentifier,
        owner: Arc<dyn Subscriber>,
        observer: Option<Arc<dyn ErrorObserver>>,
    ) -> Self {
        log::trace!("Creating message queue for channel '{}'", channel);
        let buffer = Arc::new(MessageBuffer::new(channel));
        Self {
            adapter: Arc::new(DeliveryAdapter::new(Arc::clone(&buffer))),
            buffer,
            owner: Mutex::new(Some(owner)),
            observer,
            mode: ConsumerModeCell::default(),
            consumer: Mutex::new(None),
        }
    }

    /// The channel or pattern this queue is subscribed to
    pub fn channel(&self) -> &ChannelIdentifier {
        self.buffer.channel()
    }

    /// The callback registered with the subscriber on behalf of this queue
    pub fn delivery_callback(&self) -> DeliveryCallback {
        DeliveryCallback::Queue(Arc::clone(&self.adapter))
    }

    fn owner(&self) -> Option<Arc<dyn Subscriber>> {
        lock_or_recover(&self.owner).clone()
    }

    /// Begin receiving: register the delivery adapter with the subscriber
    pub(crate) fn subscribe(&self, flags: CommandFlags) -> QueueResult<()> {
        if let Some(owner) = self.owner() {
            owner.subscribe(self.channel(), self.delivery_callback(), flags)?;
        }
        Ok(())
    }

    pub(crate) async fn subscribe_async(&self, flags: CommandFlags) -> QueueResult<()> {
        if let Some(owner) = self.owner() {
            owner
                .subscribe_async(self.channel(), self.delivery_callback(), flags)
                .await?;
        }
        Ok(())
    }

    /// Signal that resolves once the queue completes
    pub fn completion(&self) -> CompletionSignal {
        self.buffer.completion_signal()
    }

    pub fn is_completed(&self) -> bool {
        self.buffer.is_completed()
    }

    /// Number of buffered, unconsumed messages
    ///
    /// The value is exact at the instant it is read but may change
    /// immediately under concurrent delivery.
    pub fn approximate_depth(&self) -> usize {
        self.buffer.depth()
    }

    pub fn statistics(&self) -> StatisticsSnapshot {
        self.buffer.statistics().snapshot()
    }

    /// Which consumption path currently owns the queue
    pub fn consumer_mode(&self) -> ConsumerMode {
        self.mode.current()
    }

    fn claim_pull(&self) -> QueueResult<()> {
        self.mode
            .claim(ConsumerMode::Pull)
            .map(|_| ())
            .map_err(|owner| conflict(owner, ConsumerMode::Pull))
    }

    /// Wait for the next message
    ///
    /// Fails with [`QueueError::Closed`] once the queue has completed and
    /// every buffered message was read, or with [`QueueError::Cancelled`]
    /// when `cancellation` fires first. A cancelled read consumes nothing.
    pub async fn read(&self, cancellation: &CancellationToken) -> QueueResult<Message> {
        self.claim_pull()?;
        self.buffer.dequeue(Some(cancellation)).await
    }

    /// Take the next buffered message without waiting
    pub fn try_read(&self) -> QueueResult<Option<Message>> {
        self.claim_pull()?;
        Ok(self.buffer.try_dequeue())
    }

    /// View the queue as a stream of messages
    ///
    /// The stream ends when the queue completes and is drained, or when
    /// `cancellation` fires.
    pub fn stream(
        &self,
        cancellation: CancellationToken,
    ) -> QueueResult<impl Stream<Item = Message> + Send + 'static> {
        self.claim_pull()?;
        let buffer = Arc::clone(&self.buffer);
        Ok(futures::stream::unfold(
            (buffer, cancellation),
            |(buffer, cancellation)| async move {
                let next = buffer.dequeue(Some(&cancellation)).await;
                next.ok().map(|message| (message, (buffer, cancellation)))
            },
        ))
    }

    /// Start the background consumer loop with a synchronous handler
    pub fn on_message<F>(&self, handler: F) -> QueueResult<()>
    where
        F: Fn(Message) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(Some(MessageHandler::sync(handler)))
    }

    /// Start the background consumer loop with an asynchronous handler
    pub fn on_message_async<F, Fut>(&self, handler: F) -> QueueResult<()>
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.register_handler(Some(MessageHandler::asynchronous(handler)))
    }

    /// Register the queue's single handler and spawn its consumer loop
    ///
    /// Fails with [`QueueError::InvalidArgument`] for a missing handler, with
    /// [`QueueError::AlreadyRegistered`] if any handler was registered before,
    /// and with [`QueueError::ConsumerConflict`] after pull reads.
    pub fn register_handler(&self, handler: Option<MessageHandler>) -> QueueResult<()> {
        let handler = handler.ok_or_else(|| QueueError::InvalidArgument {
            message: "handler must not be empty".to_string(),
        })?;

        // A claimed queue reports its owner even off-runtime; only an
        // unclaimed queue needs the runtime before the claim
        match self.mode.current() {
            ConsumerMode::Handler => return Err(QueueError::AlreadyRegistered),
            ConsumerMode::Pull => return Err(conflict(ConsumerMode::Pull, ConsumerMode::Handler)),
            ConsumerMode::Unclaimed => {}
        }
        let runtime = Handle::try_current().map_err(|_| QueueError::NoRuntime)?;

        // Hold the slot while claiming so a concurrent join never sees a
        // claimed mode without its task handle
        let mut consumer = lock_or_recover(&self.consumer);
        match self.mode.claim(ConsumerMode::Handler) {
            Ok(true) => {}
            Ok(false) => return Err(QueueError::AlreadyRegistered),
            Err(owner) => return Err(conflict(owner, ConsumerMode::Handler)),
        }

        *consumer = Some(spawn_consumer_loop(
            &runtime,
            Arc::clone(&self.buffer),
            handler,
            self.observer.clone(),
        ));
        Ok(())
    }

    /// Wait for the background consumer loop to finish
    ///
    /// Returns `false` when no loop was started. The loop only finishes after
    /// the queue completes, so callers normally unsubscribe first.
    pub async fn join_consumer(&self) -> bool {
        let handle = lock_or_recover(&self.consumer).take();
        match handle {
            Some(handle) => {
                if let Err(e) = handle.await {
                    log::warn!(
                        "Consumer loop for channel '{}' ended abnormally: {}",
                        self.channel(),
                        e
                    );
                }
                true
            }
            None => false,
        }
    }

    /// Detach from the subscriber and complete the queue
    ///
    /// Only the first call detaches; later calls just re-request completion,
    /// which is a no-op. A detach failure is returned after the queue has
    /// been completed.
    pub fn unsubscribe(
        &self,
        error: Option<CompletionError>,
        flags: CommandFlags,
    ) -> QueueResult<()> {
        let owner = lock_or_recover(&self.owner).take();
        let detached = match owner {
            Some(owner) => owner
                .unsubscribe(self.channel(), &self.delivery_callback(), flags)
                .map(|_| ()),
            None => Ok(()),
        };
        self.finish_unsubscribe(detached, error)
    }

    /// Suspending form of [`unsubscribe`](ChannelMessageQueue::unsubscribe)
    pub async fn unsubscribe_async(
        &self,
        error: Option<CompletionError>,
        flags: CommandFlags,
    ) -> QueueResult<()> {
        let owner = lock_or_recover(&self.owner).take();
        let detached = match owner {
            Some(owner) => owner
                .unsubscribe_async(self.channel(), &self.delivery_callback(), flags)
                .await
                .map(|_| ()),
            None => Ok(()),
        };
        self.finish_unsubscribe(detached, error)
    }

    fn finish_unsubscribe(
        &self,
        detached: Result<(), crate::subscriber::SubscriberError>,
        error: Option<CompletionError>,
    ) -> QueueResult<()> {
        if let Err(e) = &detached {
            log::warn!(
                "Failed to detach queue for channel '{}' from subscriber: {}",
                self.channel(),
                e
            );
        }
        self.buffer.complete(error);
        detached.map_err(QueueError::from)
    }
}

fn conflict(owner: ConsumerMode, attempted: ConsumerMode) -> QueueError {
    let describe = |mode: ConsumerMode| match mode {
        ConsumerMode::Pull => "pull reads",
        ConsumerMode::Handler => "a registered handler",
        ConsumerMode::Unclaimed => "nothing",
    };
    QueueError::ConsumerConflict {
        owner: describe(owner),
        attempted: match attempted {
            ConsumerMode::Handler => "handler",
            _ => "pull",
        },
    }
}

impl fmt::Debug for ChannelMessageQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelMessageQueue")
            .field("channel", self.channel())
            .field("mode", &self.consumer_mode())
            .field("depth", &self.approximate_depth())
            .field("completed", &self.is_completed())
            .finish()
    }
}
