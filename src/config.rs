//! # Queue configuration.
//!
//! Provides [`QueueConfig`], the centralized settings for one
//! [`MergingQueue`](crate::MergingQueue) instance.
//!
//! ## Sentinel values
//! - `merging_time_span = 0s` → every timer-armed flush fires on the next
//!   timer tick (effectively immediate debounce)
//! - `bus_capacity` is clamped to a minimum of 1 by the bus

use std::borrow::Cow;
use std::time::Duration;

/// Configuration for a merging queue.
///
/// Defines:
/// - **Debounce behavior**: quiet period and timer-restart policy
/// - **Lifecycle**: initial active/passive state, disposal policy
/// - **Event system**: bus capacity for event delivery
///
/// ## Field semantics
/// - `name`: diagnostic label only; attached to published events
/// - `merging_time_span`: quiet period before an automatically-triggered flush
/// - `active_by_default`: whether the queue starts active (timer armed on
///   enqueue) or passive (work collects until [`activate`])
/// - `restart_timer_on_each_enqueue`: `false` keeps an armed timer's deadline
///   so constant churn cannot postpone a flush forever; `true` re-arms the
///   timer on every enqueue (classic trailing debounce)
/// - `passively_collect_in_disposed_state`: `false` discards pending work at
///   disposal; `true` keeps it pending for one best-effort explicit flush
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
///
/// [`activate`]: crate::MergingQueue::activate
#[derive(Clone, Debug)]
pub struct QueueConfig {
    /// Diagnostic label for this queue.
    ///
    /// Used in published events and log lines; carries no semantics.
    pub name: Cow<'static, str>,

    /// Quiet period between the arming enqueue and the automatic flush.
    pub merging_time_span: Duration,

    /// Whether the queue starts in the active state.
    ///
    /// A passive queue still merges enqueued updates; it arms no timer until
    /// [`activate`](crate::MergingQueue::activate) is called.
    pub active_by_default: bool,

    /// Whether an enqueue restarts an already-armed debounce timer.
    ///
    /// - `false` = the existing deadline is kept (no indefinite postponement
    ///   under continuous enqueues)
    /// - `true` = the timer is cancelled and re-armed on every enqueue
    pub restart_timer_on_each_enqueue: bool,

    /// Whether pending updates survive [`dispose`](crate::MergingQueue::dispose).
    ///
    /// - `false` = pending updates are discarded and marked rejected
    /// - `true` = pending updates stay queued so a caller may drive one
    ///   best-effort final flush; new submissions are still rejected
    pub passively_collect_in_disposed_state: bool,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers that lag behind more than `bus_capacity` messages will
    /// receive `Lagged` and skip older items. Minimum value is 1 (enforced by
    /// the bus).
    pub bus_capacity: usize,
}

impl QueueConfig {
    /// Creates a configuration with the given label and quiet period, all
    /// other fields at their defaults.
    pub fn new(name: impl Into<Cow<'static, str>>, merging_time_span: Duration) -> Self {
        Self {
            name: name.into(),
            merging_time_span,
            ..Self::default()
        }
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for QueueConfig {
    /// Default configuration:
    ///
    /// - `name = "mergeq"`
    /// - `merging_time_span = 300ms` (typical UI/file-watcher quiet period)
    /// - `active_by_default = true`
    /// - `restart_timer_on_each_enqueue = false` (keep the first deadline)
    /// - `passively_collect_in_disposed_state = false` (discard at disposal)
    /// - `bus_capacity = 1024`
    fn default() -> Self {
        Self {
            name: Cow::Borrowed("mergeq"),
            merging_time_span: Duration::from_millis(300),
            active_by_default: true,
            restart_timer_on_each_enqueue: false,
            passively_collect_in_disposed_state: false,
            bus_capacity: 1024,
        }
    }
}
