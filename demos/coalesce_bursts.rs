//! # Demo: coalesce_bursts
//!
//! Minimal demo of burst coalescing: many redundant notifications collapse
//! into one debounced execution per identity.
//!
//! Demonstrates how to:
//! - Create a [`MergingQueue`] with a short quiet period.
//! - Enqueue a burst of equal-identity updates (latest wins).
//! - Wait for the debounced flush with [`wait_for_all_executed`].
//!
//! ## Flow
//! ```text
//! enqueue("reindex") × 50 ──► PendingSet (1 entry)
//!      └─► DebounceTimer(50ms) ──► flush cycle ──► action runs once
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example coalesce_bursts
//! ```
//!
//! [`wait_for_all_executed`]: mergeq::MergingQueue::wait_for_all_executed

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use mergeq::{MergingQueue, QueueConfig, Update};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. A queue with a 50ms quiet period, active from the start
    let queue = MergingQueue::new(QueueConfig::new("indexer", Duration::from_millis(50)));

    // 2. Simulate a burst of redundant change notifications
    println!("[demo] burst of 50 notifications, all named 'reindex'");
    let executions = Arc::new(AtomicUsize::new(0));
    for _ in 0..50 {
        let executions = Arc::clone(&executions);
        queue.enqueue(Update::arc("reindex", move || {
            let executions = Arc::clone(&executions);
            async move {
                executions.fetch_add(1, Ordering::SeqCst);
                println!("[reindex] running once for the whole burst");
                Ok(())
            }
        }));
    }
    println!("[demo] pending after burst: {}", queue.len());

    // 3. The debounce timer fires once the burst goes quiet
    let done = queue.wait_for_all_executed(Duration::from_secs(1)).await;
    println!(
        "[demo] quiescent={done} executions={}",
        executions.load(Ordering::SeqCst)
    );

    queue.dispose();
    Ok(())
}
