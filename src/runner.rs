//! # Execution runner collaborator.
//!
//! Abstracts "run this batch now": the queue prepares one batch future and the
//! [`ExecutionRunner`] decides *where* it executes - inline on the calling
//! task, or handed to exactly one worker. The queue holds its serialization
//! guard across the whole call, so at most one batch is ever in flight per
//! queue; the runner must not introduce concurrent invocation on its own.
//!
//! ## Rules
//! - `run_now` receives a fully prepared batch; the runner adds no semantics.
//! - The call returns the batch outcome. A runner that loses the batch (e.g.
//!   its worker was aborted) reports [`QueueError::ExecutorFailed`].

use async_trait::async_trait;
use futures::future::BoxFuture;
use tokio::runtime::Handle;

use crate::error::QueueError;

/// One prepared flush batch, ready to execute.
pub type BatchFuture = BoxFuture<'static, Result<(), QueueError>>;

/// Runs one batch to completion.
#[async_trait]
pub trait ExecutionRunner: Send + Sync + 'static {
    /// Executes the batch and returns its outcome.
    async fn run_now(&self, batch: BatchFuture) -> Result<(), QueueError>;
}

/// Executes batches inline on the calling task (default).
#[derive(Clone, Copy, Debug, Default)]
pub struct InlineRunner;

#[async_trait]
impl ExecutionRunner for InlineRunner {
    async fn run_now(&self, batch: BatchFuture) -> Result<(), QueueError> {
        batch.await
    }
}

/// Dispatches each batch to a dedicated worker task and awaits it.
///
/// Useful when flush cycles should not run on the caller's task (e.g. to keep
/// a UI driver responsive). Serialization is unchanged: the queue awaits the
/// worker before starting another batch.
#[derive(Clone, Debug)]
pub struct SpawnRunner {
    handle: Handle,
}

impl SpawnRunner {
    /// Captures the current runtime handle.
    ///
    /// # Panics
    /// Panics when called outside a Tokio runtime; use
    /// [`SpawnRunner::with_handle`] in that case.
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

impl Default for SpawnRunner {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ExecutionRunner for SpawnRunner {
    async fn run_now(&self, batch: BatchFuture) -> Result<(), QueueError> {
        match self.handle.spawn(batch).await {
            Ok(outcome) => outcome,
            // Per-update panics are caught inside the batch; a join error here
            // means the worker itself was lost.
            Err(join_err) => Err(QueueError::ExecutorFailed {
                reason: join_err.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::error::UpdateError;

    #[tokio::test]
    async fn test_inline_runner_returns_batch_outcome() {
        let ok = InlineRunner.run_now(Box::pin(async { Ok(()) })).await;
        assert!(ok.is_ok());

        let err = InlineRunner
            .run_now(Box::pin(async {
                Err(QueueError::UpdateFailed {
                    update: "broken".into(),
                    source: UpdateError::Fail { error: "x".into() },
                })
            }))
            .await;
        assert!(matches!(err, Err(QueueError::UpdateFailed { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_spawn_runner_executes_on_worker() {
        let runner = SpawnRunner::new();
        let res = runner.run_now(Box::pin(async { Ok(()) })).await;
        assert!(res.is_ok());
    }
}
