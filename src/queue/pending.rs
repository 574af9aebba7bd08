//! # PendingSet: priority-ordered, identity-deduplicating storage.
//!
//! The data-structure heart of the merge semantics. Entries are keyed by
//! `(priority, seq)` in a `BTreeMap`, with a secondary identity index, so a
//! drain walks ascending priority and, within one priority tier, ascending
//! insertion sequence (stable FIFO).
//!
//! ## Rules
//! - At most one entry per distinct identity.
//! - A merge removes the old entry and inserts the new one with a fresh
//!   sequence number: latest wins, and the merged entry sorts at the end of
//!   its priority tier.
//! - After the identity merge, the eat pass removes every *other* pending
//!   entry the newcomer can eat; eaten entries never execute.
//! - All mutations are serialized under one internal lock, and lock poisoning
//!   is recovered: a panicking action elsewhere must never corrupt the set.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::updates::UpdateRef;

/// Result of one [`PendingSet::enqueue`], reported for observability.
#[derive(Debug, Default)]
pub(crate) struct EnqueueOutcome {
    /// The pending update replaced by an equal identity, if any.
    pub replaced: Option<UpdateRef>,
    /// Pending updates removed unexecuted by the newcomer's eat predicate.
    pub eaten: Vec<UpdateRef>,
}

#[derive(Default)]
struct Inner {
    /// Drain order: ascending (priority, insertion seq).
    entries: BTreeMap<(i32, u64), UpdateRef>,
    /// Identity → entry key, one entry per identity.
    index: HashMap<Arc<str>, (i32, u64)>,
    next_seq: u64,
}

/// Thread-safe, priority-ordered, identity-deduplicating collection.
#[derive(Default)]
pub(crate) struct PendingSet {
    inner: Mutex<Inner>,
}

impl PendingSet {
    fn locked(&self) -> MutexGuard<'_, Inner> {
        // Recover from poisoning: the guarded maps are consistent after every
        // operation, and execution never happens under this lock.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merges `update` into the set.
    ///
    /// Replaces any pending entry with equal identity, then removes every
    /// other pending entry the newcomer can eat. The returned outcome lists
    /// both so the queue can publish events outside the lock.
    pub fn enqueue(&self, update: UpdateRef) -> EnqueueOutcome {
        let mut inner = self.locked();
        let seq = inner.next_seq;
        inner.next_seq += 1;

        let mut outcome = EnqueueOutcome::default();

        if let Some(key) = inner.index.remove(update.identity()) {
            outcome.replaced = inner.entries.remove(&key);
        }

        let Inner { entries, index, .. } = &mut *inner;
        entries.retain(|_, pending| {
            if update.can_eat(pending) {
                index.remove(pending.identity());
                outcome.eaten.push(Arc::clone(pending));
                false
            } else {
                true
            }
        });

        let key = (update.priority(), seq);
        index.insert(update.identity_arc(), key);
        entries.insert(key, update);

        outcome
    }

    /// Atomically removes and returns all pending updates in execution order.
    pub fn drain_ordered(&self) -> Vec<UpdateRef> {
        let mut inner = self.locked();
        inner.index.clear();
        std::mem::take(&mut inner.entries).into_values().collect()
    }

    /// Removes one update by identity (disposal race retraction).
    pub fn remove(&self, identity: &str) -> Option<UpdateRef> {
        let mut inner = self.locked();
        let key = inner.index.remove(identity)?;
        inner.entries.remove(&key)
    }

    /// Removes and returns everything, in no particular order.
    pub fn clear(&self) -> Vec<UpdateRef> {
        self.drain_ordered()
    }

    pub fn len(&self) -> usize {
        self.locked().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locked().entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::updates::{DEFAULT_PRIORITY, HIGH_PRIORITY, Update};

    fn noop(identity: impl Into<Arc<str>>) -> UpdateRef {
        Update::arc(identity, || async { Ok(()) })
    }

    fn noop_with_priority(identity: impl Into<Arc<str>>, priority: i32) -> UpdateRef {
        Arc::new(Update::new(identity, || async { Ok(()) }).with_priority(priority))
    }

    fn identities(drained: &[UpdateRef]) -> Vec<&str> {
        drained.iter().map(|u| u.identity()).collect()
    }

    #[test]
    fn test_enqueue_then_drain_empties_set() {
        let set = PendingSet::default();
        set.enqueue(noop("a"));
        set.enqueue(noop("b"));
        assert_eq!(set.len(), 2);

        let drained = set.drain_ordered();
        assert_eq!(drained.len(), 2);
        assert!(set.is_empty());
        assert!(set.drain_ordered().is_empty());
    }

    #[test]
    fn test_equal_identity_keeps_latest_only() {
        let set = PendingSet::default();
        set.enqueue(noop("twin"));
        let second = noop("twin");
        let outcome = set.enqueue(Arc::clone(&second));

        assert!(outcome.replaced.is_some());
        assert_eq!(set.len(), 1);

        let drained = set.drain_ordered();
        assert!(Arc::ptr_eq(&drained[0], &second));
    }

    #[test]
    fn test_drain_orders_by_priority_then_insertion() {
        let set = PendingSet::default();
        set.enqueue(noop_with_priority("default", DEFAULT_PRIORITY));
        set.enqueue(noop_with_priority("high", HIGH_PRIORITY));
        set.enqueue(noop_with_priority("mid", 100));

        assert_eq!(
            identities(&set.drain_ordered()),
            vec!["high", "mid", "default"]
        );
    }

    #[test]
    fn test_fifo_within_equal_priority() {
        let set = PendingSet::default();
        for i in 0..20 {
            set.enqueue(noop(format!("u{i:02}")));
        }

        let expected: Vec<String> = (0..20).map(|i| format!("u{i:02}")).collect();
        assert_eq!(identities(&set.drain_ordered()), expected);
    }

    #[test]
    fn test_merge_moves_entry_to_end_of_its_tier() {
        let set = PendingSet::default();
        set.enqueue(noop("first"));
        set.enqueue(noop("second"));
        set.enqueue(noop("first")); // re-enqueue: latest wins, tier position resets

        assert_eq!(identities(&set.drain_ordered()), vec!["second", "first"]);
    }

    #[test]
    fn test_merge_does_not_break_priority_groups() {
        let set = PendingSet::default();
        set.enqueue(noop_with_priority("urgent", HIGH_PRIORITY));
        set.enqueue(noop("slow"));
        set.enqueue(noop_with_priority("urgent", HIGH_PRIORITY));

        assert_eq!(identities(&set.drain_ordered()), vec!["urgent", "slow"]);
    }

    #[test]
    fn test_eater_removes_matching_pending() {
        let set = PendingSet::default();
        set.enqueue(noop("victim-1"));
        set.enqueue(noop("bystander"));
        set.enqueue(noop("victim-2"));

        let eater = Arc::new(
            Update::new("eater", || async { Ok(()) })
                .with_eater(|other| other.identity().starts_with("victim")),
        );
        let outcome = set.enqueue(eater);

        assert_eq!(outcome.eaten.len(), 2);
        assert_eq!(identities(&set.drain_ordered()), vec!["bystander", "eater"]);
    }

    #[test]
    fn test_eater_does_not_eat_itself() {
        let set = PendingSet::default();
        let greedy = Arc::new(Update::new("greedy", || async { Ok(()) }).with_eater(|_| true));
        let outcome = set.enqueue(greedy);

        assert!(outcome.eaten.is_empty());
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_remove_by_identity() {
        let set = PendingSet::default();
        set.enqueue(noop("keep"));
        set.enqueue(noop("drop"));

        assert!(set.remove("drop").is_some());
        assert!(set.remove("drop").is_none());
        assert_eq!(identities(&set.drain_ordered()), vec!["keep"]);
    }

    #[test]
    fn test_concurrent_enqueue_no_loss_no_duplicates() {
        let set = Arc::new(PendingSet::default());
        let threads = 10;
        let per_thread = 100;

        let handles: Vec<_> = (0..threads)
            .map(|t| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || {
                    for i in 0..per_thread {
                        set.enqueue(noop(format!("t{t}-u{i}")));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let drained = set.drain_ordered();
        assert_eq!(drained.len(), threads * per_thread);

        let mut seen: Vec<&str> = identities(&drained);
        seen.sort_unstable();
        seen.dedup();
        assert_eq!(seen.len(), threads * per_thread);
    }

    #[test]
    fn test_concurrent_same_identity_keeps_one() {
        let set = Arc::new(PendingSet::default());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let set = Arc::clone(&set);
                std::thread::spawn(move || {
                    for _ in 0..200 {
                        set.enqueue(noop("contended"));
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        assert_eq!(set.len(), 1);
    }
}
