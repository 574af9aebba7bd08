//! # Debounce timer collaborator.
//!
//! The queue never sleeps on its own; it asks an injected [`DebounceTimer`]
//! to invoke a callback after the configured quiet period and to cancel that
//! request when the schedule changes (deactivation, disposal, restart-on-add).
//!
//! Two implementations are provided:
//! - [`TokioTimer`] - production timer driven by a captured runtime handle,
//!   so scheduling is safe from threads outside the runtime.
//! - [`ManualTimer`] - deterministic fake for tests: scheduled callbacks are
//!   held until the test fires them explicitly.
//!
//! ## Rules
//! - One queue issues at most one live schedule at a time.
//! - Cancellation is cooperative via `CancellationToken`: a callback that
//!   already started is not interrupted.

use std::sync::Mutex;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

/// Callback invoked when the quiet period elapses.
pub type TimerCallback = BoxFuture<'static, ()>;

/// Handle to one scheduled callback.
///
/// Dropping the handle does **not** cancel the schedule; call
/// [`TimerHandle::cancel`] (or [`DebounceTimer::cancel`]).
#[derive(Clone, Debug)]
pub struct TimerHandle {
    token: CancellationToken,
}

impl TimerHandle {
    fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Cancels the scheduled callback if it has not started yet.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the schedule was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Schedule-after-delay collaborator consumed by the queue.
///
/// The queue guarantees it never holds two live schedules at once;
/// implementations do not need to coalesce.
pub trait DebounceTimer: Send + Sync + 'static {
    /// Schedules `callback` to run once `delay` has elapsed.
    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;

    /// Cancels a previously returned schedule.
    fn cancel(&self, handle: &TimerHandle) {
        handle.cancel();
    }
}

/// Production timer on a captured Tokio runtime handle.
///
/// Capturing the handle at construction keeps
/// [`enqueue`](crate::MergingQueue::enqueue) callable from arbitrary threads:
/// the sleep task is spawned onto the captured runtime rather than the
/// caller's context.
#[derive(Clone, Debug)]
pub struct TokioTimer {
    handle: Handle,
}

impl TokioTimer {
    /// Captures the current runtime handle.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use
    /// [`TokioTimer::with_handle`] in that case.
    pub fn new() -> Self {
        Self {
            handle: Handle::current(),
        }
    }

    /// Uses an explicit runtime handle.
    pub fn with_handle(handle: Handle) -> Self {
        Self { handle }
    }
}

impl Default for TokioTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl DebounceTimer for TokioTimer {
    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::new();
        let token = handle.token.clone();

        self.handle.spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    callback.await;
                }
            }
        });

        handle
    }
}

/// One entry recorded by [`ManualTimer`].
struct ManualEntry {
    delay: Duration,
    callback: TimerCallback,
    handle: TimerHandle,
}

/// Deterministic timer for tests.
///
/// `schedule_after` records the callback instead of sleeping; the test drives
/// time explicitly with [`ManualTimer::fire_all`]. Cancelled entries are
/// dropped unfired.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use mergeq::{DebounceTimer, ManualTimer};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let timer = ManualTimer::default();
/// let handle = timer.schedule_after(Duration::from_millis(300), Box::pin(async {}));
/// assert_eq!(timer.scheduled_count(), 1);
///
/// handle.cancel();
/// timer.fire_all().await; // cancelled entry is dropped
/// assert_eq!(timer.scheduled_count(), 0);
/// # }
/// ```
#[derive(Default)]
pub struct ManualTimer {
    entries: Mutex<Vec<ManualEntry>>,
}

impl ManualTimer {
    /// Number of recorded schedules, cancelled ones included.
    pub fn scheduled_count(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Delay of the most recent schedule, if any.
    pub fn last_delay(&self) -> Option<Duration> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .last()
            .map(|e| e.delay)
    }

    /// Fires every recorded, uncancelled callback in schedule order.
    ///
    /// Entries are consumed; callbacks scheduled *during* the fire (e.g. a
    /// flush arming the next timer) are retained for the next call.
    pub async fn fire_all(&self) {
        let drained: Vec<ManualEntry> = {
            let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            std::mem::take(&mut *entries)
        };

        for entry in drained {
            if !entry.handle.is_cancelled() {
                entry.callback.await;
            }
        }
    }
}

impl DebounceTimer for ManualTimer {
    fn schedule_after(&self, delay: Duration, callback: TimerCallback) -> TimerHandle {
        let handle = TimerHandle::new();
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(ManualEntry {
                delay,
                callback,
                handle: handle.clone(),
            });
        handle
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_fires_after_delay() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = TokioTimer::new();

        let hit = Arc::clone(&fired);
        timer.schedule_after(
            Duration::from_millis(300),
            Box::pin(async move {
                hit.fetch_add(1, Ordering::SeqCst);
            }),
        );

        tokio::time::sleep(Duration::from_millis(299)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_timer_cancel_prevents_fire() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = TokioTimer::new();

        let hit = Arc::clone(&fired);
        let handle = timer.schedule_after(
            Duration::from_millis(100),
            Box::pin(async move {
                hit.fetch_add(1, Ordering::SeqCst);
            }),
        );
        timer.cancel(&handle);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_manual_timer_fires_in_schedule_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let timer = ManualTimer::default();

        for i in 0..3 {
            let order = Arc::clone(&order);
            timer.schedule_after(
                Duration::from_millis(10 * (i + 1)),
                Box::pin(async move {
                    order.lock().unwrap().push(i);
                }),
            );
        }

        timer.fire_all().await;
        assert_eq!(*order.lock().unwrap(), vec![0, 1, 2]);
        assert_eq!(timer.scheduled_count(), 0);
    }

    #[tokio::test]
    async fn test_manual_timer_skips_cancelled_entries() {
        let fired = Arc::new(AtomicUsize::new(0));
        let timer = ManualTimer::default();

        let hit = Arc::clone(&fired);
        let keep = timer.schedule_after(
            Duration::from_millis(10),
            Box::pin(async move {
                hit.fetch_add(1, Ordering::SeqCst);
            }),
        );
        let hit = Arc::clone(&fired);
        let drop_me = timer.schedule_after(
            Duration::from_millis(10),
            Box::pin(async move {
                hit.fetch_add(1, Ordering::SeqCst);
            }),
        );

        drop_me.cancel();
        assert!(!keep.is_cancelled());

        timer.fire_all().await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
