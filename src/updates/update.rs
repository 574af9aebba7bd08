//! # Update: one deduplicated unit of deferred work.
//!
//! An [`Update`] bundles an identity (the merge key), a priority, the deferred
//! action, and two optional behavior hooks: an expiration probe and an eat
//! predicate. The hooks are plain closures held in the struct, defaulting to
//! constant `false`.
//!
//! The action is a closure that *creates* a new future per run. This avoids
//! shared mutable state between runs; if shared state is needed, move an
//! `Arc<...>` into the closure explicitly.
//!
//! ## Merge semantics
//! Equality for merging purposes is defined solely by [`Update::identity`]:
//! two updates with equal identity are the same logical request, and the
//! later occurrence wins.
//!
//! ## Example
//! ```rust
//! use mergeq::{HIGH_PRIORITY, Update, UpdateRef};
//!
//! let repaint: UpdateRef = Update::arc("repaint", || async { Ok(()) });
//! assert_eq!(repaint.identity(), "repaint");
//!
//! let urgent = Update::new("save-state", || async { Ok(()) })
//!     .with_priority(HIGH_PRIORITY);
//! assert_eq!(urgent.priority(), HIGH_PRIORITY);
//! assert!(!urgent.is_expired());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use futures::future::BoxFuture;

use crate::error::UpdateError;

/// Priority of explicitly urgent updates; sorts before every default update.
pub const HIGH_PRIORITY: i32 = 10;

/// Priority assigned when none is given; large so that any explicitly
/// prioritized update runs earlier.
pub const DEFAULT_PRIORITY: i32 = 999;

/// Shared handle to an update (`Arc<Update>`).
pub type UpdateRef = Arc<Update>;

/// Boxed action future, created fresh per run.
pub type UpdateFuture = BoxFuture<'static, Result<(), UpdateError>>;

type Action = Box<dyn Fn() -> UpdateFuture + Send + Sync>;
type ExpiryProbe = Box<dyn Fn() -> bool + Send + Sync>;
type EatPredicate = Box<dyn Fn(&Update) -> bool + Send + Sync>;

/// One deduplicated unit of deferred work.
///
/// Immutable after construction apart from the `rejected` flag, which is set
/// only by queue disposal.
///
/// ### Lifecycle
/// Created by a producer and enqueued; lives in the pending set until it is
/// - executed,
/// - superseded by a later update with equal identity,
/// - eaten by a later update, or
/// - rejected at disposal time.
pub struct Update {
    identity: Arc<str>,
    priority: i32,
    action: Action,
    expired: ExpiryProbe,
    eats: EatPredicate,
    rejected: AtomicBool,
}

impl Update {
    /// Creates an update with [`DEFAULT_PRIORITY`] and constant-false hooks.
    ///
    /// ### Parameters
    /// - `identity`: explicit comparable merge key (never reference identity)
    /// - `action`: closure producing a fresh future per run; may itself
    ///   enqueue further updates
    pub fn new<F, Fut>(identity: impl Into<Arc<str>>, action: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), UpdateError>> + Send + 'static,
    {
        Self {
            identity: identity.into(),
            priority: DEFAULT_PRIORITY,
            action: Box::new(move || -> UpdateFuture { Box::pin(action()) }),
            expired: Box::new(|| false),
            eats: Box::new(|_| false),
            rejected: AtomicBool::new(false),
        }
    }

    /// Creates the update and returns it as a shared handle.
    ///
    /// Prefer this when you immediately need an [`UpdateRef`].
    ///
    /// ## Example
    /// ```rust
    /// use mergeq::{Update, UpdateRef};
    ///
    /// let u: UpdateRef = Update::arc("revalidate", || async { Ok(()) });
    /// assert_eq!(u.identity(), "revalidate");
    /// ```
    pub fn arc<F, Fut>(identity: impl Into<Arc<str>>, action: F) -> UpdateRef
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), UpdateError>> + Send + 'static,
    {
        Arc::new(Self::new(identity, action))
    }

    /// Returns a new update with the given priority (lower runs earlier).
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Returns a new update with an expiration probe.
    ///
    /// The probe is re-checked immediately before execution, not at enqueue
    /// time; an update can expire while waiting in the queue. An expired
    /// update is skipped silently.
    pub fn with_expiration<P>(mut self, expired: P) -> Self
    where
        P: Fn() -> bool + Send + Sync + 'static,
    {
        self.expired = Box::new(expired);
        self
    }

    /// Returns a new update with an eat predicate.
    ///
    /// When this update is merged into the pending set, every *other* pending
    /// update matching the predicate is removed without ever executing.
    pub fn with_eater<P>(mut self, eats: P) -> Self
    where
        P: Fn(&Update) -> bool + Send + Sync + 'static,
    {
        self.eats = Box::new(eats);
        self
    }

    /// Returns the merge key.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Returns the merge key as a shared handle (cheap clone for events and
    /// map keys).
    pub(crate) fn identity_arc(&self) -> Arc<str> {
        Arc::clone(&self.identity)
    }

    /// Returns the priority; lower value = higher urgency = runs earlier.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Creates a fresh future executing the deferred action.
    pub(crate) fn run(&self) -> UpdateFuture {
        (self.action)()
    }

    /// Whether the update reports itself expired.
    pub fn is_expired(&self) -> bool {
        (self.expired)()
    }

    /// Whether this update, on enqueue, removes `other` from the pending set.
    pub fn can_eat(&self, other: &Update) -> bool {
        (self.eats)(other)
    }

    /// Whether the update was rejected by disposal.
    ///
    /// Set for updates submitted after [`dispose`] and for pending updates
    /// discarded at disposal time; never set by any other path.
    ///
    /// [`dispose`]: crate::MergingQueue::dispose
    pub fn is_rejected(&self) -> bool {
        self.rejected.load(AtomicOrdering::Acquire)
    }

    pub(crate) fn reject(&self) {
        self.rejected.store(true, AtomicOrdering::Release);
    }
}

impl fmt::Debug for Update {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Update")
            .field("identity", &self.identity)
            .field("priority", &self.priority)
            .field("rejected", &self.is_rejected())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop(identity: &'static str) -> Update {
        Update::new(identity, || async { Ok(()) })
    }

    #[test]
    fn test_defaults() {
        let u = noop("plain");
        assert_eq!(u.identity(), "plain");
        assert_eq!(u.priority(), DEFAULT_PRIORITY);
        assert!(!u.is_expired());
        assert!(!u.is_rejected());
        assert!(!u.can_eat(&noop("other")));
    }

    #[test]
    fn test_priority_constants_order() {
        assert!(HIGH_PRIORITY < DEFAULT_PRIORITY);
    }

    #[test]
    fn test_expiration_probe_is_live() {
        let expired = Arc::new(AtomicBool::new(false));
        let probe = Arc::clone(&expired);
        let u = noop("volatile").with_expiration(move || probe.load(AtomicOrdering::SeqCst));

        assert!(!u.is_expired());
        expired.store(true, AtomicOrdering::SeqCst);
        assert!(u.is_expired());
    }

    #[test]
    fn test_eat_predicate_sees_other_update() {
        let eater = noop("broad").with_eater(|other| other.identity().starts_with("narrow"));
        assert!(eater.can_eat(&noop("narrow-1")));
        assert!(!eater.can_eat(&noop("unrelated")));
    }

    #[test]
    fn test_reject_flag_is_sticky() {
        let u = noop("late");
        u.reject();
        assert!(u.is_rejected());
    }

    #[tokio::test]
    async fn test_action_produces_fresh_future_per_run() {
        use std::sync::atomic::AtomicUsize;

        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let u = Update::new("counted", move || {
            let counter = Arc::clone(&counter);
            async move {
                counter.fetch_add(1, AtomicOrdering::SeqCst);
                Ok(())
            }
        });

        u.run().await.unwrap();
        u.run().await.unwrap();
        assert_eq!(runs.load(AtomicOrdering::SeqCst), 2);
    }
}
