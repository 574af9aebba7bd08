//! # Queue builder: collaborator and subscriber injection.
//!
//! [`QueueBuilder`] wires one [`MergingQueue`] with its collaborators:
//! a [`DebounceTimer`], an [`ExecutionRunner`], and optional event
//! subscribers. Defaults are the production pair
//! ([`TokioTimer`](crate::TokioTimer), [`InlineRunner`]).
//!
//! Subscribers are bridged from the queue's bus by a listener task:
//!
//! ```text
//! MergingQueue ── publish ──► Bus ──► listener ──► SubscriberSet::emit
//! ```

use std::sync::Arc;

use crate::config::QueueConfig;
use crate::queue::core::MergingQueue;
use crate::runner::{ExecutionRunner, InlineRunner};
use crate::subscribers::{Subscribe, SubscriberSet};
use crate::timer::{DebounceTimer, TokioTimer};

/// Builder for [`MergingQueue`].
///
/// ## Example
/// ```rust
/// use std::sync::Arc;
/// use std::time::Duration;
/// use mergeq::{ManualTimer, MergingQueue, QueueConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let timer = Arc::new(ManualTimer::default());
/// let queue = MergingQueue::builder(QueueConfig::new("test", Duration::from_millis(300)))
///     .with_timer(timer.clone())
///     .build();
///
/// assert_eq!(queue.name(), "test");
/// # }
/// ```
pub struct QueueBuilder {
    cfg: QueueConfig,
    timer: Option<Arc<dyn DebounceTimer>>,
    runner: Option<Arc<dyn ExecutionRunner>>,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl QueueBuilder {
    pub(crate) fn new(cfg: QueueConfig) -> Self {
        Self {
            cfg,
            timer: None,
            runner: None,
            subscribers: Vec::new(),
        }
    }

    /// Injects the debounce timer collaborator.
    pub fn with_timer(mut self, timer: Arc<dyn DebounceTimer>) -> Self {
        self.timer = Some(timer);
        self
    }

    /// Injects the execution runner collaborator.
    pub fn with_runner(mut self, runner: Arc<dyn ExecutionRunner>) -> Self {
        self.runner = Some(runner);
        self
    }

    /// Adds one event subscriber.
    pub fn with_subscriber(mut self, subscriber: Arc<dyn Subscribe>) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    /// Adds a batch of event subscribers.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers.extend(subscribers);
        self
    }

    /// Builds the queue and spawns the subscriber listener if needed.
    ///
    /// # Panics
    /// Panics outside a Tokio runtime when subscribers are present or when a
    /// default collaborator has to capture the current runtime handle.
    pub fn build(self) -> Arc<MergingQueue> {
        let timer = self
            .timer
            .unwrap_or_else(|| Arc::new(TokioTimer::new()) as Arc<dyn DebounceTimer>);
        let runner = self
            .runner
            .unwrap_or_else(|| Arc::new(InlineRunner) as Arc<dyn ExecutionRunner>);

        let queue = MergingQueue::with_collaborators(self.cfg, timer, runner);

        if !self.subscribers.is_empty() {
            let set = SubscriberSet::new(self.subscribers);
            let mut rx = queue.subscribe();
            tokio::spawn(async move {
                while let Ok(ev) = rx.recv().await {
                    set.emit(&ev);
                }
            });
        }

        queue
    }
}
