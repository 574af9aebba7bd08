//! # mergeq
//!
//! **mergeq** is a merging, priority-ordered, debounced work queue for Rust.
//!
//! Interactive systems receive bursts of redundant change notifications —
//! repaint requests, filesystem events, re-validation triggers — and must
//! coalesce them into a single unit of work executed after a quiet period,
//! while respecting relative urgency and supporting cancellation. This crate
//! provides that coalescing scheduler as a building block: producers enqueue
//! [`Update`]s from any thread, equal identities merge (latest wins), and a
//! debounce timer drives strictly serialized flush cycles.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  producer #1      producer #2      producer #N        (any thread)
//!      │                │                │
//!      └── enqueue ─────┼── enqueue ─────┘
//!                       ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  MergingQueue (orchestrator)                                      │
//! │  - PendingSet (merge by identity, eat pass, priority order)       │
//! │  - lifecycle  (active/passive, disposed, armed timer)             │
//! │  - in-flight guard (one batch at a time, reentrancy-aware)        │
//! │  - Bus (broadcast events)                                         │
//! └──────┬──────────────────────────────────────────────┬─────────────┘
//!        │ active: schedule_after(merging_time_span)    │ publish(Event)
//!        ▼                                              ▼
//! ┌──────────────────┐                        ┌──────────────────────┐
//! │  DebounceTimer   │                        │  Bus ─► listener ─►  │
//! │  (TokioTimer /   │                        │  SubscriberSet       │
//! │   ManualTimer)   │                        │  (LogWriter, custom) │
//! └──────┬───────────┘                        └──────────────────────┘
//!        │ fires
//!        ▼
//!   drain_ordered() ──► ExecutionRunner::run_now(batch)
//!                          (InlineRunner / SpawnRunner)
//!                          per update: expired? skip : run()
//!                          re-drain until empty, release guard
//! ```
//!
//! ### Flush lifecycle
//! ```text
//! Idle ──enqueue(active)──► TimerScheduled ──fire──► Flushing ──► Idle
//!   │                            │                      ▲
//!   │ flush()                    │ deactivate()         │ flush()
//!   └────────────────────────────┴──────────────────────┘
//!
//! Disposed: reachable from every state, terminal.
//! Idle + non-empty pending + passive = valid dormant state.
//! ```
//!
//! ## Features
//! | Area              | Description                                                         | Key types / traits                          |
//! |-------------------|---------------------------------------------------------------------|---------------------------------------------|
//! | **Updates**       | Deduplicated units of deferred work with priority and hooks.        | [`Update`], [`UpdateRef`]                   |
//! | **Orchestration** | Debounced, serialized flush cycles over merged work.                | [`MergingQueue`], [`QueueBuilder`]          |
//! | **Collaborators** | Injected timer and batch executor, fakes for deterministic tests.   | [`DebounceTimer`], [`ExecutionRunner`]      |
//! | **Subscriber API**| Hook into queue lifecycle events (logging, metrics, custom).        | [`Subscribe`], [`SubscriberSet`]            |
//! | **Errors**        | Typed errors for actions and flush cycles.                          | [`UpdateError`], [`QueueError`]             |
//! | **Configuration** | Centralize queue settings.                                          | [`QueueConfig`]                             |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use mergeq::{HIGH_PRIORITY, MergingQueue, QueueConfig, Update};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let queue = MergingQueue::new(QueueConfig::new("revalidate", Duration::from_millis(200)));
//!
//!     // Burst of identical requests: merged, the action runs once.
//!     for _ in 0..3 {
//!         queue.enqueue(Update::arc("lint", || async {
//!             println!("linting");
//!             Ok(())
//!         }));
//!     }
//!
//!     // An urgent update sorts before default-priority work.
//!     queue.enqueue(
//!         Update::new("save", || async {
//!             println!("saving");
//!             Ok(())
//!         })
//!         .with_priority(HIGH_PRIORITY)
//!         .into(),
//!     );
//!
//!     queue.flush().await?;
//!     assert!(queue.wait_for_all_executed(Duration::from_secs(1)).await);
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod events;
mod queue;
mod runner;
mod subscribers;
mod timer;
mod updates;

// ---- Public re-exports ----

pub use config::QueueConfig;
pub use error::{QueueError, UpdateError};
pub use events::{Bus, Event, EventKind};
pub use queue::{MergingQueue, QueueBuilder};
pub use runner::{BatchFuture, ExecutionRunner, InlineRunner, SpawnRunner};
pub use subscribers::{Subscribe, SubscriberSet};
pub use timer::{DebounceTimer, ManualTimer, TimerCallback, TimerHandle, TokioTimer};
pub use updates::{DEFAULT_PRIORITY, HIGH_PRIORITY, Update, UpdateFuture, UpdateRef};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
