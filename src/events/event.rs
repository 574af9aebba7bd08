//! # Runtime events emitted by the merging queue.
//!
//! The [`EventKind`] enum classifies event types across three categories:
//! - **Intake events**: what happened to an update on enqueue
//!   (enqueued, merged over a predecessor, eaten, rejected)
//! - **Flush events**: flush cycle progress (started, completed) and
//!   per-update outcomes (expired skip, action failure)
//! - **Lifecycle events**: active/passive transitions and disposal
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! queue label, update identities, reasons, and batch sizes.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases
//! monotonically. Use `seq` to restore the exact order when events are
//! delivered out of order.
//!
//! ## Example
//! ```rust
//! use mergeq::{Event, EventKind};
//!
//! let ev = Event::now(EventKind::UpdateFailed)
//!     .with_update("revalidate")
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::UpdateFailed);
//! assert_eq!(ev.update.as_deref(), Some("revalidate"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of queue events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Intake events ===
    /// An update was accepted into the pending set.
    ///
    /// Sets:
    /// - `update`: update identity
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Enqueued,

    /// An update replaced a pending update with the same identity.
    ///
    /// The replaced update's action will never run.
    ///
    /// Sets:
    /// - `update`: identity shared by both updates
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Merged,

    /// A pending update was removed unexecuted by a newly enqueued eater.
    ///
    /// Sets:
    /// - `update`: identity of the eaten update
    /// - `reason`: identity of the eater
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Eaten,

    /// An update was submitted after disposal and marked rejected.
    ///
    /// Also published for pending updates discarded at disposal time.
    ///
    /// Sets:
    /// - `update`: update identity
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Rejected,

    // === Flush events ===
    /// A flush batch is about to execute.
    ///
    /// Sets:
    /// - `batch_len`: number of drained updates
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    FlushStarted,

    /// A flush batch finished (all non-expired updates were invoked).
    ///
    /// Sets:
    /// - `batch_len`: number of drained updates
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    FlushCompleted,

    /// An update was skipped because it reported itself expired.
    ///
    /// Sets:
    /// - `update`: update identity
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    UpdateExpired,

    /// An update's action failed (error return or caught panic).
    ///
    /// The batch continues past the failure.
    ///
    /// Sets:
    /// - `update`: update identity
    /// - `reason`: failure message
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    UpdateFailed,

    // === Lifecycle events ===
    /// The queue became active; a timer is armed if work is pending.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Activated,

    /// The queue became passive; any armed timer was cancelled.
    ///
    /// Pending updates remain queued.
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Deactivated,

    /// The queue was disposed (terminal).
    ///
    /// Sets:
    /// - `at`: wall-clock timestamp
    /// - `seq`: global sequence
    Disposed,
}

/// Queue event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `queue`: diagnostic label of the emitting queue
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,

    /// Event classification.
    pub kind: EventKind,
    /// Diagnostic label of the queue that published the event.
    pub queue: Option<Arc<str>>,
    /// Identity of the update, if applicable.
    pub update: Option<Arc<str>>,
    /// Human-readable reason (errors, eater identity, etc.).
    pub reason: Option<Arc<str>>,
    /// Debounce delay in milliseconds (compact).
    pub delay_ms: Option<u32>,
    /// Number of updates in the flushed batch.
    pub batch_len: Option<u32>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next
    /// sequence number.
    pub fn now(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            queue: None,
            update: None,
            reason: None,
            delay_ms: None,
            batch_len: None,
        }
    }

    /// Attaches the emitting queue's diagnostic label.
    #[inline]
    pub fn with_queue(mut self, queue: impl Into<Arc<str>>) -> Self {
        self.queue = Some(queue.into());
        self
    }

    /// Attaches an update identity.
    #[inline]
    pub fn with_update(mut self, update: impl Into<Arc<str>>) -> Self {
        self.update = Some(update.into());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a debounce delay (stored as milliseconds).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.delay_ms = Some(ms);
        self
    }

    /// Attaches the size of a flushed batch.
    #[inline]
    pub fn with_batch_len(mut self, len: usize) -> Self {
        self.batch_len = Some(len.min(u32::MAX as usize) as u32);
        self
    }
}
