//! In-process subscriber
//!
//! Stands in for a real server connection: publishing on the subscriber
//! dispatches synchronously to every matching registration on the calling
//! thread, in registration order. Pattern subscriptions use glob syntax
//! (`*`, `?`, `[..]`) matched against the published channel name; names that
//! are not valid UTF-8 only reach literal subscriptions.

use crate::core::sync::{lock_or_recover, read_or_recover, write_or_recover};
use crate::queue::{ChannelIdentifier, ErrorObserver, Payload};
use crate::subscriber::error::{SubscriberError, SubscriberResult};
use crate::subscriber::traits::{CommandFlags, DeliveryCallback, Subscriber};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, RwLock};

struct Registration {
    channel: ChannelIdentifier,
    matcher: Option<glob::Pattern>,
    callback: DeliveryCallback,
}

impl Registration {
    fn matches(&self, published: &ChannelIdentifier) -> bool {
        match &self.matcher {
            // Glob patterns only apply to UTF-8 names; a lossy decode could
            // make distinct binary names look alike
            Some(pattern) => std::str::from_utf8(published.as_bytes())
                .is_ok_and(|name| pattern.matches(name)),
            None => self.channel.as_bytes() == published.as_bytes(),
        }
    }
}

/// Process-local [`Subscriber`]
pub struct InMemorySubscriber {
    registrations: RwLock<Vec<Registration>>,
    closed: AtomicBool,
    last_flags: Mutex<Option<CommandFlags>>,
    observer: Option<Arc<dyn ErrorObserver>>,
}

impl Default for InMemorySubscriber {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemorySubscriber {
    pub fn new() -> Self {
        Self {
            registrations: RwLock::new(Vec::new()),
            closed: AtomicBool::new(false),
            last_flags: Mutex::new(None),
            observer: None,
        }
    }

    /// Observer handed to the consumer loops of queues created from this subscriber
    pub fn with_error_observer(mut self, observer: Arc<dyn ErrorObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Deliver `payload` to every registration matching `channel`
    ///
    /// Returns the number of callbacks invoked. Nothing is delivered once
    /// the subscriber has shut down.
    pub fn publish(&self, channel: &ChannelIdentifier, payload: Payload) -> usize {
        if self.is_closed() {
            log::trace!("Publish to '{}' after shutdown ignored", channel);
            return 0;
        }

        let targets: Vec<(ChannelIdentifier, DeliveryCallback)> =
            read_or_recover(&self.registrations)
                .iter()
                .filter(|registration| registration.matches(channel))
                .map(|registration| {
                    (
                        registration.channel.clone(),
                        registration.callback.clone(),
                    )
                })
                .collect();

        for (subscription, callback) in &targets {
            callback.deliver(subscription, Some(channel), Some(&payload));
        }
        targets.len()
    }

    /// Protocol-level delivery to the registrations made for exactly `target`
    ///
    /// Either part may be missing; both missing is the shutdown sentinel.
    pub fn deliver_raw(
        &self,
        target: &ChannelIdentifier,
        channel: Option<&ChannelIdentifier>,
        payload: Option<&Payload>,
    ) -> usize {
        let targets: Vec<DeliveryCallback> = read_or_recover(&self.registrations)
            .iter()
            .filter(|registration| &registration.channel == target)
            .map(|registration| registration.callback.clone())
            .collect();

        for callback in &targets {
            callback.deliver(target, channel, payload);
        }
        targets.len()
    }

    /// Remove every registration, completing the queue-backed ones
    ///
    /// Returns the number of queues completed.
    pub fn unsubscribe_all(&self) -> usize {
        let removed = std::mem::take(&mut *write_or_recover(&self.registrations));
        let mut completed = 0;
        for registration in removed {
            if let Some(adapter) = registration.callback.as_queue() {
                adapter.mark_completed(None);
                completed += 1;
            }
        }
        log::debug!("Removed all subscriptions, completed {} queues", completed);
        completed
    }

    /// Close the connection
    ///
    /// Queue-backed registrations receive the shutdown sentinel. Later
    /// subscribe and unsubscribe calls fail with [`SubscriberError::Closed`].
    pub fn shutdown(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let removed = std::mem::take(&mut *write_or_recover(&self.registrations));
        for registration in removed {
            if registration.callback.is_queue_backed() {
                registration.callback.deliver(&registration.channel, None, None);
            }
        }
        log::debug!("In-memory subscriber shut down");
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn subscription_count(&self) -> usize {
        read_or_recover(&self.registrations).len()
    }

    pub fn is_subscribed(&self, channel: &ChannelIdentifier) -> bool {
        read_or_recover(&self.registrations)
            .iter()
            .any(|registration| &registration.channel == channel)
    }

    /// Flags passed with the most recent subscribe or unsubscribe
    pub fn last_flags(&self) -> Option<CommandFlags> {
        *lock_or_recover(&self.last_flags)
    }

    fn record_flags(&self, flags: CommandFlags) {
        *lock_or_recover(&self.last_flags) = Some(flags);
    }
}

impl Subscriber for InMemorySubscriber {
    fn subscribe(
        &self,
        channel: &ChannelIdentifier,
        callback: DeliveryCallback,
        flags: CommandFlags,
    ) -> SubscriberResult<()> {
        if self.is_closed() {
            return Err(SubscriberError::Closed);
        }

        let matcher = if channel.is_pattern() {
            let invalid = |message: String| SubscriberError::InvalidPattern {
                pattern: channel.name_lossy(),
                message,
            };
            let pattern = std::str::from_utf8(channel.as_bytes())
                .map_err(|_| invalid("pattern is not valid UTF-8".to_string()))?;
            Some(glob::Pattern::new(pattern).map_err(|e| invalid(e.to_string()))?)
        } else {
            None
        };

        self.record_flags(flags);
        write_or_recover(&self.registrations).push(Registration {
            channel: channel.clone(),
            matcher,
            callback,
        });
        log::trace!("Subscribed to '{}' ({})", channel, flags);
        Ok(())
    }

    fn unsubscribe(
        &self,
        channel: &ChannelIdentifier,
        callback: &DeliveryCallback,
        flags: CommandFlags,
    ) -> SubscriberResult<bool> {
        if self.is_closed() {
            return Err(SubscriberError::Closed);
        }

        self.record_flags(flags);
        let mut registrations = write_or_recover(&self.registrations);
        let position = registrations.iter().position(|registration| {
            &registration.channel == channel && registration.callback.same_target(callback)
        });
        match position {
            Some(index) => {
                registrations.remove(index);
                log::trace!("Unsubscribed from '{}' ({})", channel, flags);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn error_observer(&self) -> Option<Arc<dyn ErrorObserver>> {
        self.observer.clone()
    }
}
