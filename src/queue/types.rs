//! Type definitions for the queue system
//!
//! Statistics tracking and consumption-mode bookkeeping shared by the
//! queue internals and the public queue handle.

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};

/// Counters maintained by a queue over its lifetime
#[derive(Debug, Default)]
pub(crate) struct QueueStatistics {
    enqueued: AtomicU64,
    dequeued: AtomicU64,
    ignored_after_completion: AtomicU64,
    handler_failures: AtomicU64,
}

impl QueueStatistics {
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dequeued(&self) {
        self.dequeued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_ignored(&self) {
        self.ignored_after_completion
            .fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_handler_failure(&self) {
        self.handler_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatisticsSnapshot {
        StatisticsSnapshot {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dequeued: self.dequeued.load(Ordering::Relaxed),
            ignored_after_completion: self.ignored_after_completion.load(Ordering::Relaxed),
            handler_failures: self.handler_failures.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of a queue's counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticsSnapshot {
    /// Messages accepted into the buffer
    pub enqueued: u64,
    /// Messages handed to a reader or the consumer loop
    pub dequeued: u64,
    /// Deliveries dropped because the queue had already completed
    pub ignored_after_completion: u64,
    /// Handler invocations that returned an error or panicked
    pub handler_failures: u64,
}

/// Which consumption path owns a queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "kebab-case")]
pub enum ConsumerMode {
    /// Nothing has read from the queue yet
    Unclaimed,
    /// Direct reads through `read`, `try_read` or `stream`
    Pull,
    /// A registered background handler
    Handler,
}

impl ConsumerMode {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConsumerMode::Pull,
            2 => ConsumerMode::Handler,
            _ => ConsumerMode::Unclaimed,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            ConsumerMode::Unclaimed => 0,
            ConsumerMode::Pull => 1,
            ConsumerMode::Handler => 2,
        }
    }
}

/// Set-once cell recording the consumption mode of a queue
///
/// The first claim wins through a single compare-and-set; later claims for
/// the same mode succeed, claims for the other mode report the owner.
#[derive(Debug, Default)]
pub(crate) struct ConsumerModeCell(AtomicU8);

impl ConsumerModeCell {
    pub fn current(&self) -> ConsumerMode {
        ConsumerMode::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Claim the cell for `mode`
    ///
    /// Returns `Ok(true)` when this call performed the transition, `Ok(false)`
    /// when the cell already held `mode`, and `Err(owner)` otherwise.
    pub fn claim(&self, mode: ConsumerMode) -> Result<bool, ConsumerMode> {
        match self.0.compare_exchange(
            ConsumerMode::Unclaimed.as_u8(),
            mode.as_u8(),
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => Ok(true),
            Err(current) if current == mode.as_u8() => Ok(false),
            Err(current) => Err(ConsumerMode::from_u8(current)),
        }
    }
}
