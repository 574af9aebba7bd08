//! # Demo: priority_and_eating
//!
//! Shows priority ordering and the eat predicate, with the built-in
//! [`LogWriter`] subscriber tracing queue events to stdout.
//!
//! Demonstrates how to:
//! - Wire a queue through [`MergingQueue::builder`] with a subscriber.
//! - Sort urgent work before default-priority work.
//! - Let a broad update eat narrower pending ones.
//!
//! ## Run
//! ```bash
//! cargo run --example priority_and_eating --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use mergeq::{HIGH_PRIORITY, LogWriter, MergingQueue, QueueConfig, Update};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let queue = MergingQueue::builder(QueueConfig::new("repaint", Duration::from_millis(30)))
        .with_subscriber(Arc::new(LogWriter))
        .build();

    // Narrow repaints queued first...
    for line in [3, 7, 9] {
        queue.enqueue(Update::arc(format!("repaint-line-{line}"), move || async move {
            println!("[action] repainting line {line}");
            Ok(())
        }));
    }

    // ...then a full repaint that makes them redundant.
    queue.enqueue(Arc::new(
        Update::new("repaint-all", || async {
            println!("[action] repainting everything");
            Ok(())
        })
        .with_eater(|other| other.identity().starts_with("repaint-line-")),
    ));

    // An urgent update enqueued last still runs first.
    queue.enqueue(Arc::new(
        Update::new("flush-caret", || async {
            println!("[action] caret state flushed");
            Ok(())
        })
        .with_priority(HIGH_PRIORITY),
    ));

    queue.flush().await?;
    queue.dispose();

    // Give the subscriber worker a moment to drain its queue.
    tokio::time::sleep(Duration::from_millis(50)).await;
    Ok(())
}
