//! # MergingQueue: the coalescing orchestrator.
//!
//! Owns the [`PendingSet`], the active/passive lifecycle, the
//! execution-serialization guard, and the injected
//! [`DebounceTimer`]/[`ExecutionRunner`] collaborators.
//!
//! ## Data flow
//! ```text
//! producers (any thread)
//!     │ enqueue(update)
//!     ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │ MergingQueue                                                │
//! │   PendingSet  ◄── merge by identity, eat pass               │
//! │   lifecycle   ◄── active/passive, disposed, timer handle    │
//! │   in_flight   ◄── single-flight guard (one batch at a time) │
//! └──────┬──────────────────────────────────────────────────────┘
//!        │ active? arm DebounceTimer(merging_time_span)
//!        ▼
//!   timer fires ──► drain_ordered() ──► ExecutionRunner::run_now(batch)
//!                        ▲                   │ per update:
//!                        │                   │   expired? skip
//!                        │                   │   run(), catch panic
//!                        └── re-drain until empty (reentrant enqueues)
//! ```
//!
//! ## Rules
//! - Exactly one flush cycle executes at a time (`in_flight` guard).
//! - A timer fire that finds a cycle running is a no-op: the running cycle
//!   re-drains before releasing the guard.
//! - `flush()` from inside a running action returns immediately instead of
//!   deadlocking; the surrounding cycle picks up whatever the action queued.
//! - Disposal is terminal: later submissions are marked rejected and never
//!   stored.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use futures::FutureExt;
use tokio::sync::{Notify, broadcast};

use crate::config::QueueConfig;
use crate::error::{QueueError, UpdateError};
use crate::events::{Bus, Event, EventKind};
use crate::queue::builder::QueueBuilder;
use crate::queue::pending::PendingSet;
use crate::runner::{ExecutionRunner, InlineRunner};
use crate::timer::{DebounceTimer, TimerCallback, TimerHandle, TokioTimer};
use crate::updates::UpdateRef;

/// Global counter handing out queue ids for reentrancy tagging.
static NEXT_QUEUE_ID: AtomicU64 = AtomicU64::new(0);

tokio::task_local! {
    /// Id of the queue whose batch is executing on this task, if any.
    ///
    /// The async analogue of an owning-thread-tagged lock: every batch future
    /// is wrapped in a scope carrying its queue's id, so a reentrant `flush`
    /// can recognize its own cycle wherever the runner placed it.
    static ACTIVE_FLUSH: u64;
}

/// Mutable lifecycle state, guarded by one mutex.
struct Lifecycle {
    active: bool,
    disposed: bool,
    timer_handle: Option<TimerHandle>,
}

/// Merging, priority-ordered, debounced work queue.
///
/// ### Responsibilities
/// - **Intake**: merge updates by identity, apply eat predicates
/// - **Debounce**: arm the timer while active; keep or restart the deadline
///   per [`QueueConfig::restart_timer_on_each_enqueue`]
/// - **Serialization**: at most one batch in flight, reentrancy-safe
/// - **Lifecycle**: active/passive gating, terminal disposal
/// - **Observability**: publish [`Event`]s for every intake/flush/lifecycle
///   transition
///
/// ### Example
/// ```rust
/// use std::time::Duration;
/// use mergeq::{MergingQueue, QueueConfig, Update};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let queue = MergingQueue::new(QueueConfig::new("repaint", Duration::from_millis(50)));
///
///     queue.enqueue(Update::arc("redraw", || async {
///         println!("redrawing");
///         Ok(())
///     }));
///
///     // Debounced execution; or force it now:
///     queue.flush().await?;
///     assert!(queue.is_empty());
///     Ok(())
/// }
/// ```
pub struct MergingQueue {
    cfg: QueueConfig,
    id: u64,
    /// Back-reference handed to timer callbacks; a fire after the last strong
    /// reference dropped fails to upgrade and does nothing.
    me: Weak<Self>,
    /// `cfg.name` as a shared handle, attached to every published event.
    label: Arc<str>,
    pending: PendingSet,
    timer: Arc<dyn DebounceTimer>,
    runner: Arc<dyn ExecutionRunner>,
    bus: Bus,
    lifecycle: Mutex<Lifecycle>,
    /// True exactly while a batch is being executed.
    in_flight: AtomicBool,
    /// Signalled whenever the queue may have become quiescent.
    quiesced: Notify,
}

impl MergingQueue {
    /// Creates a queue with the default collaborators ([`TokioTimer`],
    /// [`InlineRunner`]) and no subscribers.
    ///
    /// # Panics
    /// Panics outside a Tokio runtime (the default timer captures the current
    /// handle); use [`MergingQueue::builder`] with an explicit timer there.
    pub fn new(cfg: QueueConfig) -> Arc<Self> {
        Self::with_collaborators(cfg, Arc::new(TokioTimer::new()), Arc::new(InlineRunner))
    }

    /// Starts a builder for injecting collaborators and subscribers.
    pub fn builder(cfg: QueueConfig) -> QueueBuilder {
        QueueBuilder::new(cfg)
    }

    pub(crate) fn with_collaborators(
        cfg: QueueConfig,
        timer: Arc<dyn DebounceTimer>,
        runner: Arc<dyn ExecutionRunner>,
    ) -> Arc<Self> {
        let label: Arc<str> = Arc::from(cfg.name.as_ref());
        Arc::new_cyclic(|me| Self {
            id: NEXT_QUEUE_ID.fetch_add(1, AtomicOrdering::Relaxed),
            me: Weak::clone(me),
            label,
            pending: PendingSet::default(),
            bus: Bus::new(cfg.bus_capacity_clamped()),
            lifecycle: Mutex::new(Lifecycle {
                active: cfg.active_by_default,
                disposed: false,
                timer_handle: None,
            }),
            in_flight: AtomicBool::new(false),
            quiesced: Notify::new(),
            timer,
            runner,
            cfg,
        })
    }

    /// Merges `update` into the queue. Never blocks on execution; callable
    /// from any thread.
    ///
    /// - Disposed queue: the update is marked rejected and dropped.
    /// - Active queue: the debounce timer is armed. An already-armed timer
    ///   keeps its deadline unless
    ///   [`QueueConfig::restart_timer_on_each_enqueue`] is set.
    /// - Passive queue: the update just collects until [`activate`] or an
    ///   explicit [`flush`].
    ///
    /// [`activate`]: MergingQueue::activate
    /// [`flush`]: MergingQueue::flush
    pub fn enqueue(&self, update: UpdateRef) {
        if self.is_disposed() {
            update.reject();
            self.bus
                .publish(self.event(EventKind::Rejected).with_update(update.identity_arc()));
            return;
        }

        let outcome = self.pending.enqueue(Arc::clone(&update));

        {
            let mut lifecycle = self.lifecycle_lock();
            if lifecycle.disposed {
                // Disposal raced the merge above; retract the entry.
                drop(lifecycle);
                if let Some(late) = self.pending.remove(update.identity()) {
                    late.reject();
                }
                update.reject();
                self.bus
                    .publish(self.event(EventKind::Rejected).with_update(update.identity_arc()));
                return;
            }
            if lifecycle.active {
                self.arm_timer(&mut lifecycle);
            }
        }

        self.bus
            .publish(self.event(EventKind::Enqueued).with_update(update.identity_arc()));
        if let Some(replaced) = outcome.replaced {
            self.bus
                .publish(self.event(EventKind::Merged).with_update(replaced.identity_arc()));
        }
        for eaten in outcome.eaten {
            self.bus.publish(
                self.event(EventKind::Eaten)
                    .with_update(eaten.identity_arc())
                    .with_reason(update.identity_arc()),
            );
        }
    }

    /// Makes the queue live: pending work gets a debounced flush scheduled.
    ///
    /// No-op if already active or disposed.
    pub fn activate(&self) {
        {
            let mut lifecycle = self.lifecycle_lock();
            if lifecycle.disposed || lifecycle.active {
                return;
            }
            lifecycle.active = true;
            if !self.pending.is_empty() {
                self.arm_timer(&mut lifecycle);
            }
        }
        self.bus.publish(self.event(EventKind::Activated));
    }

    /// Makes the queue dormant: cancels any armed timer.
    ///
    /// Pending updates are **not** discarded; they flush once the queue is
    /// reactivated or explicitly flushed. No-op if passive or disposed.
    pub fn deactivate(&self) {
        {
            let mut lifecycle = self.lifecycle_lock();
            if lifecycle.disposed || !lifecycle.active {
                return;
            }
            lifecycle.active = false;
            if let Some(handle) = lifecycle.timer_handle.take() {
                self.timer.cancel(&handle);
            }
        }
        self.bus.publish(self.event(EventKind::Deactivated));
    }

    /// Executes all currently pending updates now, regardless of the
    /// active/passive state.
    ///
    /// - Called while another flush is in flight: waits until the queue is
    ///   quiescent (pending set empty, nothing in flight) and then returns.
    /// - Called reentrantly from inside a running action: returns `Ok(())`
    ///   immediately; the surrounding cycle re-drains after the action's
    ///   batch, so anything the action queued still executes.
    ///
    /// Returns the first action failure of the run, after the whole batch
    /// has finished. Later failures are only observable as
    /// [`EventKind::UpdateFailed`] events.
    pub async fn flush(&self) -> Result<(), QueueError> {
        if self.inside_own_flush() {
            return Ok(());
        }

        loop {
            if self.try_begin_flight() {
                let outcome = self.run_cycles().await;
                self.finish_flight();
                return outcome;
            }

            let notified = self.quiesced.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();
            if self.is_quiescent() {
                return Ok(());
            }
            if !self.in_flight.load(AtomicOrdering::Acquire) {
                // The flight ended between the guard check and registration;
                // retry the acquisition instead of waiting.
                continue;
            }
            notified.await;
        }
    }

    /// Blocks until the pending set is empty and no flush is in flight, or
    /// the timeout elapses.
    ///
    /// Work enqueued by a running action extends the wait: quiescence is
    /// re-evaluated after every flush cycle. Returns `false` on timeout —
    /// an expected outcome, not an error.
    pub async fn wait_for_all_executed(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.quiesced.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();
                if self.is_quiescent() {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(timeout, wait).await.is_ok()
    }

    /// Disposes the queue. Terminal: no further transitions.
    ///
    /// Cancels any armed timer and rejects every subsequently submitted
    /// update. Pending updates are discarded and marked rejected, unless
    /// [`QueueConfig::passively_collect_in_disposed_state`] keeps them queued
    /// for one best-effort explicit [`flush`](MergingQueue::flush).
    pub fn dispose(&self) {
        let discarded = {
            let mut lifecycle = self.lifecycle_lock();
            if lifecycle.disposed {
                return;
            }
            lifecycle.disposed = true;
            lifecycle.active = false;
            if let Some(handle) = lifecycle.timer_handle.take() {
                self.timer.cancel(&handle);
            }
            if self.cfg.passively_collect_in_disposed_state {
                Vec::new()
            } else {
                self.pending.clear()
            }
        };

        for update in discarded {
            update.reject();
            self.bus
                .publish(self.event(EventKind::Rejected).with_update(update.identity_arc()));
        }
        self.bus.publish(self.event(EventKind::Disposed));
        self.quiesced.notify_waiters();
    }

    /// Diagnostic label of this queue.
    pub fn name(&self) -> &str {
        &self.label
    }

    /// Whether the queue is live (timer armed on enqueue).
    pub fn is_active(&self) -> bool {
        self.lifecycle_lock().active
    }

    /// Whether [`dispose`](MergingQueue::dispose) was called.
    pub fn is_disposed(&self) -> bool {
        self.lifecycle_lock().disposed
    }

    /// Whether no updates are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Number of pending updates.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Creates a raw receiver observing subsequent queue events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    // === internals ===

    fn lifecycle_lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn event(&self, kind: EventKind) -> Event {
        Event::now(kind).with_queue(Arc::clone(&self.label))
    }

    fn inside_own_flush(&self) -> bool {
        ACTIVE_FLUSH.try_with(|id| *id == self.id).unwrap_or(false)
    }

    fn try_begin_flight(&self) -> bool {
        self.in_flight
            .compare_exchange(
                false,
                true,
                AtomicOrdering::AcqRel,
                AtomicOrdering::Acquire,
            )
            .is_ok()
    }

    fn finish_flight(&self) {
        self.in_flight.store(false, AtomicOrdering::Release);
        self.quiesced.notify_waiters();
    }

    fn is_quiescent(&self) -> bool {
        !self.in_flight.load(AtomicOrdering::Acquire) && self.pending.is_empty()
    }

    /// Arms the debounce timer, or keeps the existing deadline per policy.
    ///
    /// Caller holds the lifecycle lock and has verified active && !disposed.
    fn arm_timer(&self, lifecycle: &mut Lifecycle) {
        let live = lifecycle
            .timer_handle
            .as_ref()
            .is_some_and(|h| !h.is_cancelled());
        if live {
            if !self.cfg.restart_timer_on_each_enqueue {
                return;
            }
            if let Some(handle) = lifecycle.timer_handle.take() {
                self.timer.cancel(&handle);
            }
        }

        let weak = Weak::clone(&self.me);
        let callback: TimerCallback = Box::pin(async move {
            if let Some(queue) = weak.upgrade() {
                queue.on_timer().await;
            }
        });
        lifecycle.timer_handle =
            Some(self.timer.schedule_after(self.cfg.merging_time_span, callback));
    }

    /// Timer-triggered flush entry.
    async fn on_timer(self: Arc<Self>) {
        {
            let mut lifecycle = self.lifecycle_lock();
            lifecycle.timer_handle = None;
            if lifecycle.disposed || !lifecycle.active {
                return;
            }
        }

        if !self.try_begin_flight() {
            // A cycle is running; it re-drains the set before releasing the
            // guard, so this fire has nothing left to do.
            return;
        }
        // Failures have no caller on this path; they were published as
        // UpdateFailed events by the batch itself.
        let _ = self.run_cycles().await;
        self.finish_flight();
    }

    /// Drain-execute loop, run under the flight guard.
    ///
    /// Loops until a drain comes back empty so reentrantly enqueued work
    /// executes without an external trigger.
    async fn run_cycles(&self) -> Result<(), QueueError> {
        let mut first_failure: Option<QueueError> = None;

        loop {
            let batch = self.pending.drain_ordered();
            if batch.is_empty() {
                break;
            }
            let len = batch.len();
            self.bus
                .publish(self.event(EventKind::FlushStarted).with_batch_len(len));

            let fut = execute_batch(self.id, Arc::clone(&self.label), self.bus.clone(), batch);
            let outcome = self.runner.run_now(Box::pin(fut)).await;

            self.bus
                .publish(self.event(EventKind::FlushCompleted).with_batch_len(len));
            if let Err(err) = outcome {
                first_failure.get_or_insert(err);
            }
        }

        match first_failure {
            None => Ok(()),
            Some(err) => Err(err),
        }
    }
}

impl std::fmt::Debug for MergingQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MergingQueue")
            .field("name", &self.label)
            .field("pending", &self.pending.len())
            .field("active", &self.is_active())
            .field("disposed", &self.is_disposed())
            .finish_non_exhaustive()
    }
}

/// Executes one drained batch in order, inside the reentrancy scope.
///
/// Expired updates are skipped silently; failures and caught panics are
/// published and recorded, and never stop the rest of the batch.
async fn execute_batch(
    queue_id: u64,
    label: Arc<str>,
    bus: Bus,
    batch: Vec<UpdateRef>,
) -> Result<(), QueueError> {
    ACTIVE_FLUSH
        .scope(queue_id, async move {
            let mut first_failure: Option<QueueError> = None;

            for update in batch {
                if update.is_expired() {
                    bus.publish(
                        Event::now(EventKind::UpdateExpired)
                            .with_queue(Arc::clone(&label))
                            .with_update(update.identity_arc()),
                    );
                    continue;
                }

                let run = std::panic::AssertUnwindSafe(update.run()).catch_unwind().await;
                let result = match run {
                    Ok(result) => result,
                    Err(payload) => Err(UpdateError::Panicked {
                        message: panic_message(payload),
                    }),
                };

                if let Err(source) = result {
                    bus.publish(
                        Event::now(EventKind::UpdateFailed)
                            .with_queue(Arc::clone(&label))
                            .with_update(update.identity_arc())
                            .with_reason(source.to_string()),
                    );
                    if first_failure.is_none() {
                        first_failure = Some(QueueError::UpdateFailed {
                            update: update.identity_arc(),
                            source,
                        });
                    }
                }
            }

            match first_failure {
                None => Ok(()),
                Some(err) => Err(err),
            }
        })
        .await
}

/// Renders a caught panic payload as text.
fn panic_message(payload: Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
