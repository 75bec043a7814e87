//! Background consumer loop for registered message handlers
//!
//! A queue runs at most one loop, spawned when its handler is registered.
//! The loop owns only the queue buffer, the handler and the error observer;
//! nothing from the registering caller's context is carried into the task.
//!
//! Delivery is best effort: a handler that returns an error or panics is
//! skipped over and the loop moves on to the next message. The loop ends
//! when the queue has completed and every buffered message was handled, or
//! when its read step fails with anything other than the closed condition.

use crate::queue::error::QueueResult;
use crate::queue::internal::MessageBuffer;
use crate::queue::message::{ChannelIdentifier, Message};
use crate::queue::observer::ErrorObserver;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Error type user handlers may return
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Outcome of one handler invocation
pub type HandlerResult = Result<(), HandlerError>;

type SyncHandlerFn = dyn Fn(Message) -> HandlerResult + Send + Sync;
type AsyncHandlerFn = dyn Fn(Message) -> BoxFuture<'static, HandlerResult> + Send + Sync;

/// A user callback in one of its two supported shapes
///
/// # Example
///
/// ```rust
/// use subqueue::queue::MessageHandler;
///
/// let sync = MessageHandler::sync(|message| {
///     println!("{}", message);
///     Ok(())
/// });
///
/// let asynchronous = MessageHandler::asynchronous(|message| async move {
///     println!("{}", message);
///     Ok(())
/// });
/// # let _ = (sync, asynchronous);
/// ```
#[derive(Clone)]
pub enum MessageHandler {
    Sync(Arc<SyncHandlerFn>),
    Async(Arc<AsyncHandlerFn>),
}

impl MessageHandler {
    pub fn sync<F>(handler: F) -> Self
    where
        F: Fn(Message) -> HandlerResult + Send + Sync + 'static,
    {
        MessageHandler::Sync(Arc::new(handler))
    }

    pub fn asynchronous<F, Fut>(handler: F) -> Self
    where
        F: Fn(Message) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        MessageHandler::Async(Arc::new(move |message| handler(message).boxed()))
    }

    pub fn shape(&self) -> &'static str {
        match self {
            MessageHandler::Sync(_) => "sync",
            MessageHandler::Async(_) => "async",
        }
    }
}

impl fmt::Debug for MessageHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageHandler::{}", self.shape())
    }
}

/// Where the consumer loop reads from
///
/// Implemented by the queue buffer; the loop only needs these four calls.
pub(crate) trait MessageSource: Send + Sync + 'static {
    fn channel(&self) -> &ChannelIdentifier;

    fn try_next(&self) -> Option<Message>;

    fn next(&self) -> BoxFuture<'_, QueueResult<Message>>;

    fn record_handler_failure(&self);
}

impl MessageSource for MessageBuffer {
    fn channel(&self) -> &ChannelIdentifier {
        MessageBuffer::channel(self)
    }

    fn try_next(&self) -> Option<Message> {
        self.try_dequeue()
    }

    fn next(&self) -> BoxFuture<'_, QueueResult<Message>> {
        Box::pin(self.dequeue(None))
    }

    fn record_handler_failure(&self) {
        self.statistics().record_handler_failure();
    }
}

/// Spawn the loop on `runtime` and return its tracked handle
pub(crate) fn spawn_consumer_loop(
    runtime: &Handle,
    buffer: Arc<MessageBuffer>,
    handler: MessageHandler,
    observer: Option<Arc<dyn ErrorObserver>>,
) -> JoinHandle<()> {
    runtime.spawn(run_consumer_loop(buffer, handler, observer))
}

async fn run_consumer_loop<S: MessageSource>(
    source: Arc<S>,
    handler: MessageHandler,
    observer: Option<Arc<dyn ErrorObserver>>,
) {
    log::debug!(
        "Consumer loop started for channel '{}' ({} handler)",
        source.channel(),
        handler.shape()
    );

    loop {
        let message = match source.try_next() {
            Some(message) => message,
            None => match source.next().await {
                Ok(message) => message,
                Err(error) if error.is_closed() => break,
                Err(error) => {
                    log::debug!(
                        "Consumer loop for channel '{}' stopped by read fault: {}",
                        source.channel(),
                        error
                    );
                    if let Some(observer) = &observer {
                        observer.on_internal_error(source.channel(), &error);
                    }
                    break;
                }
            },
        };

        if let Err(failure) = dispatch(&handler, message).await {
            source.record_handler_failure();
            log::trace!(
                "Handler for channel '{}' failed: {}",
                source.channel(),
                failure
            );
        }
    }

    log::debug!("Consumer loop for channel '{}' exited", source.channel());
}

/// Invoke the handler, folding returned errors and panics into one failure
async fn dispatch(handler: &MessageHandler, message: Message) -> Result<(), String> {
    match handler {
        MessageHandler::Sync(handler) => {
            match std::panic::catch_unwind(AssertUnwindSafe(|| handler(message))) {
                Ok(outcome) => outcome.map_err(|error| error.to_string()),
                Err(panic) => Err(panic_message(panic.as_ref())),
            }
        }
        MessageHandler::Async(handler) => {
            let mut pending = match std::panic::catch_unwind(AssertUnwindSafe(|| handler(message)))
            {
                Ok(pending) => pending,
                Err(panic) => return Err(panic_message(panic.as_ref())),
            };

            // An outcome that is already finished is taken without suspending
            let outcome = match AssertUnwindSafe(&mut pending).catch_unwind().now_or_never() {
                Some(outcome) => outcome,
                None => AssertUnwindSafe(pending).catch_unwind().await,
            };

            match outcome {
                Ok(result) => result.map_err(|error| error.to_string()),
                Err(panic) => Err(panic_message(panic.as_ref())),
            }
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
