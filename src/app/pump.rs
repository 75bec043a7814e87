//! Message pump: drives queues end to end over an in-memory subscriber
//!
//! One queue is opened per configured channel and pattern. Messages are
//! published on every literal channel, consumed in the configured mode and
//! checked for per-channel ordering once every queue has been unsubscribed.

use crate::core::config::{ConsumeMode, PumpConfig};
use crate::core::error_handling::ContextualError;
use crate::core::sync::lock_or_recover;
use crate::queue::{
    ChannelIdentifier, ChannelMessageQueue, HandlerResult, LoggingErrorObserver, Message,
    Payload, QueueError,
};
use crate::subscriber::{CommandFlags, InMemorySubscriber, SubscriberExt};
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum PumpError {
    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error("Pull consumer for channel '{channel}' failed: {message}")]
    Consumer { channel: String, message: String },
}

impl ContextualError for PumpError {
    fn is_user_actionable(&self) -> bool {
        match self {
            PumpError::Queue(e) => e.is_user_actionable(),
            PumpError::Consumer { .. } => false,
        }
    }

    fn user_message(&self) -> Option<&str> {
        match self {
            PumpError::Queue(e) => e.user_message(),
            PumpError::Consumer { .. } => None,
        }
    }
}

/// Outcome for one queue
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueSummary {
    pub channel: ChannelIdentifier,
    pub delivered: usize,
    /// Every source channel's messages arrived in publish order
    pub in_order: bool,
    pub handler_failures: u64,
}

type Received = Arc<Mutex<Vec<(String, usize)>>>;

struct RunningQueue {
    queue: Arc<ChannelMessageQueue>,
    received: Received,
    pull: Option<JoinHandle<()>>,
}

/// Run one pump pass with `config`
pub async fn run_pump(config: &PumpConfig) -> Result<Vec<QueueSummary>, PumpError> {
    let subscriber = Arc::new(
        InMemorySubscriber::new().with_error_observer(Arc::new(LoggingErrorObserver)),
    );

    let identifiers = config
        .channels
        .iter()
        .map(|name| ChannelIdentifier::literal(name.clone()))
        .chain(
            config
                .patterns
                .iter()
                .map(|pattern| ChannelIdentifier::pattern(pattern.clone())),
        );

    let mut running = Vec::new();
    for channel in identifiers {
        let queue = subscriber
            .subscribe_queue_async(channel, CommandFlags::None)
            .await?;
        let received: Received = Arc::new(Mutex::new(Vec::new()));
        let pull = start_consumer(&queue, config, Arc::clone(&received))?;
        log::debug!(
            "Queue for '{}' consuming in {} mode",
            queue.channel(),
            config.mode
        );
        running.push(RunningQueue {
            queue,
            received,
            pull,
        });
    }

    let mut published = 0;
    for index in 0..config.messages {
        for name in &config.channels {
            let channel = ChannelIdentifier::literal(name.clone());
            published += subscriber.publish(&channel, Payload::from(index.to_string()));
        }
    }
    log::info!(
        "Published {} messages, {} deliveries across {} queues",
        config.messages * config.channels.len(),
        published,
        running.len()
    );

    let mut summaries = Vec::with_capacity(running.len());
    for RunningQueue {
        queue,
        received,
        pull,
    } in running
    {
        queue.unsubscribe_async(None, CommandFlags::None).await?;
        if let Some(task) = pull {
            task.await.map_err(|e| PumpError::Consumer {
                channel: queue.channel().to_string(),
                message: e.to_string(),
            })?;
        }
        queue.join_consumer().await;
        summaries.push(summarize(&queue, &received));
    }
    Ok(summaries)
}

/// Attach the configured consumer; pull mode returns the draining task
fn start_consumer(
    queue: &Arc<ChannelMessageQueue>,
    config: &PumpConfig,
    received: Received,
) -> Result<Option<JoinHandle<()>>, QueueError> {
    match config.mode {
        ConsumeMode::Pull => {
            if config.fail_every.is_some() {
                log::debug!("fail_every has no effect in pull mode");
            }
            let mut messages = Box::pin(queue.stream(CancellationToken::new())?);
            Ok(Some(tokio::spawn(async move {
                while let Some(message) = messages.next().await {
                    record(&received, &message);
                }
            })))
        }
        ConsumeMode::Sync => {
            let handler = RecordingHandler::new(received, config.fail_every);
            queue.on_message(move |message| handler.handle(&message))?;
            Ok(None)
        }
        ConsumeMode::Async => {
            let handler = Arc::new(RecordingHandler::new(received, config.fail_every));
            queue.on_message_async(move |message| {
                let handler = Arc::clone(&handler);
                async move {
                    tokio::task::yield_now().await;
                    handler.handle(&message)
                }
            })?;
            Ok(None)
        }
    }
}

struct RecordingHandler {
    received: Received,
    fail_every: Option<usize>,
    seen: AtomicUsize,
}

impl RecordingHandler {
    fn new(received: Received, fail_every: Option<usize>) -> Self {
        Self {
            received,
            fail_every,
            seen: AtomicUsize::new(0),
        }
    }

    fn handle(&self, message: &Message) -> HandlerResult {
        record(&self.received, message);
        let count = self.seen.fetch_add(1, Ordering::Relaxed) + 1;
        match self.fail_every {
            Some(every) if count % every == 0 => {
                Err(format!("injected failure on message {}", count).into())
            }
            _ => Ok(()),
        }
    }
}

fn record(received: &Received, message: &Message) {
    let index = std::str::from_utf8(message.payload().as_bytes())
        .ok()
        .and_then(|text| text.parse().ok())
        .unwrap_or(usize::MAX);
    lock_or_recover(received).push((message.channel().name_lossy(), index));
}

fn summarize(queue: &ChannelMessageQueue, received: &Received) -> QueueSummary {
    let received = lock_or_recover(received);
    QueueSummary {
        channel: queue.channel().clone(),
        delivered: received.len(),
        in_order: is_ordered_per_channel(&received),
        handler_failures: queue.statistics().handler_failures,
    }
}

fn is_ordered_per_channel(received: &[(String, usize)]) -> bool {
    let mut last: HashMap<&str, usize> = HashMap::new();
    received.iter().all(|(channel, index)| {
        let ordered = last.get(channel.as_str()).map_or(true, |prev| index > prev);
        last.insert(channel.as_str(), *index);
        ordered
    })
}
