//! Internal MessageBuffer implementation
//!
//! The buffer is the single shared mutable resource of a subscription:
//! - Unbounded FIFO of delivered messages
//! - Sticky completion state (with an optional completion error)
//! - Wake-ups for suspended readers via [`Notify`]
//! - A depth counter maintained alongside every enqueue and dequeue
//!
//! Writes come from exactly one delivery adapter. Reads may come from the
//! consumer loop or from pull callers; the buffer itself tolerates several.

use crate::core::sync::lock_or_recover;
use crate::queue::error::{CompletionError, QueueError, QueueResult};
use crate::queue::message::{ChannelIdentifier, Message};
use crate::queue::types::QueueStatistics;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{watch, Notify};
use tokio_util::sync::CancellationToken;

/// Lifecycle of a buffer: `Active` until completed, then terminal
#[derive(Debug, Clone, Default)]
pub(crate) enum CompletionState {
    #[default]
    Active,
    Completed(Option<CompletionError>),
}

impl CompletionState {
    fn is_completed(&self) -> bool {
        matches!(self, CompletionState::Completed(_))
    }

    fn error(&self) -> Option<CompletionError> {
        match self {
            CompletionState::Completed(error) => error.clone(),
            CompletionState::Active => None,
        }
    }
}

/// Entries and completion state guarded together, so a write can never
/// slip in behind a completed reader check
#[derive(Debug, Default)]
struct Entries {
    messages: VecDeque<Message>,
    state: CompletionState,
}

#[derive(Debug)]
pub(crate) struct MessageBuffer {
    channel: Arc<ChannelIdentifier>,
    entries: Mutex<Entries>,
    depth: AtomicUsize,
    available: Notify,
    completion: watch::Sender<CompletionState>,
    statistics: QueueStatistics,
}

impl MessageBuffer {
    pub fn new(channel: ChannelIdentifier) -> Self {
        let (completion, _) = watch::channel(CompletionState::Active);
        Self {
            channel: Arc::new(channel),
            entries: Mutex::new(Entries::default()),
            depth: AtomicUsize::new(0),
            available: Notify::new(),
            completion,
            statistics: QueueStatistics::default(),
        }
    }

    pub fn channel(&self) -> &ChannelIdentifier {
        &self.channel
    }

    /// Shared handle used as the weak back-reference of delivered messages
    pub fn channel_ref(&self) -> &Arc<ChannelIdentifier> {
        &self.channel
    }

    pub fn statistics(&self) -> &QueueStatistics {
        &self.statistics
    }

    /// Append a message; ignored once the buffer has completed
    ///
    /// Never blocks on readers and never rejects for capacity.
    pub fn enqueue(&self, message: Message) -> bool {
        {
            let mut entries = lock_or_recover(&self.entries);
            if entries.state.is_completed() {
                self.statistics.record_ignored();
                return false;
            }
            entries.messages.push_back(message);
            self.depth.fetch_add(1, Ordering::Release);
        }
        self.statistics.record_enqueued();
        self.available.notify_waiters();
        true
    }

    /// Take the next buffered message without waiting
    ///
    /// Buffered messages stay drainable after completion.
    pub fn try_dequeue(&self) -> Option<Message> {
        let message = {
            let mut entries = lock_or_recover(&self.entries);
            let message = entries.messages.pop_front()?;
            self.depth.fetch_sub(1, Ordering::Release);
            message
        };
        self.statistics.record_dequeued();
        Some(message)
    }

    /// Next message, or the closed error once completed and drained
    fn poll_entry(&self) -> Option<QueueResult<Message>> {
        let mut entries = lock_or_recover(&self.entries);
        if let Some(message) = entries.messages.pop_front() {
            self.depth.fetch_sub(1, Ordering::Release);
            drop(entries);
            self.statistics.record_dequeued();
            return Some(Ok(message));
        }
        let closed = match &entries.state {
            CompletionState::Completed(error) => Some(Err(QueueError::Closed {
                channel: (*self.channel).clone(),
                source: error.clone(),
            })),
            CompletionState::Active => None,
        };
        closed
    }

    /// Suspend until a message is available, the buffer completes, or
    /// `cancellation` fires
    ///
    /// Cancellation is checked before anything is taken, so a cancelled call
    /// never consumes a message.
    pub async fn dequeue(&self, cancellation: Option<&CancellationToken>) -> QueueResult<Message> {
        loop {
            if cancellation.is_some_and(|token| token.is_cancelled()) {
                return Err(QueueError::Cancelled);
            }

            // Register interest before checking so a concurrent enqueue or
            // completion cannot be missed between the check and the wait
            let notified = self.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(result) = self.poll_entry() {
                return result;
            }

            match cancellation {
                Some(token) => {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => return Err(QueueError::Cancelled),
                        _ = &mut notified => {}
                    }
                }
                None => notified.await,
            }
        }
    }

    /// Transition to completed; returns false if already completed
    pub fn complete(&self, error: Option<CompletionError>) -> bool {
        {
            let mut entries = lock_or_recover(&self.entries);
            if entries.state.is_completed() {
                return false;
            }
            entries.state = CompletionState::Completed(error.clone());
        }

        log::debug!(
            "Queue for channel '{}' completed{}",
            self.channel,
            if error.is_some() { " with error" } else { "" }
        );
        self.completion
            .send_replace(CompletionState::Completed(error));
        self.available.notify_waiters();
        true
    }

    pub fn is_completed(&self) -> bool {
        lock_or_recover(&self.entries).state.is_completed()
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Acquire)
    }

    pub fn completion_signal(&self) -> CompletionSignal {
        CompletionSignal {
            receiver: self.completion.subscribe(),
        }
    }
}

/// Observable completion of a queue
///
/// Resolves exactly once, when the queue transitions to completed. Clones
/// observe the same transition.
#[derive(Debug, Clone)]
pub struct CompletionSignal {
    receiver: watch::Receiver<CompletionState>,
}

impl CompletionSignal {
    pub fn is_completed(&self) -> bool {
        self.receiver.borrow().is_completed()
    }

    /// The error the queue was completed with, if any
    pub fn error(&self) -> Option<CompletionError> {
        self.receiver.borrow().error()
    }

    /// Wait for completion and return the completion error, if any
    ///
    /// A queue dropped without ever completing never resolves the wait.
    pub async fn wait(&self) -> Option<CompletionError> {
        let mut receiver = self.receiver.clone();
        let error = match receiver.wait_for(|state| state.is_completed()).await {
            Ok(state) => Some(state.error()),
            Err(_) => None,
        };
        match error {
            Some(error) => error,
            None => std::future::pending().await,
        }
    }
}
