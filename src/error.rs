//! Error types used by the merging queue and by update actions.
//!
//! This module defines two main error enums:
//!
//! - [`UpdateError`] — errors raised by an individual update's action.
//! - [`QueueError`] — errors surfaced by a flush cycle as a whole.
//!
//! Both types provide helper methods (`as_label`, `as_message`) for
//! logging/metrics.
//!
//! Two conditions are deliberately **not** errors:
//! - an update enqueued after [`dispose`](crate::MergingQueue::dispose) is a
//!   silent no-op observable through the update's `rejected` flag;
//! - an expired update is skipped silently before execution.

use std::sync::Arc;

use thiserror::Error;

/// # Errors produced by an update's action.
///
/// A failing action never stops the rest of its batch and never corrupts the
/// pending set; the first failure of a flush cycle is reported to the caller
/// once the whole batch has finished.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum UpdateError {
    /// The action returned an error.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The action panicked; the panic was caught and converted.
    #[error("action panicked: {message}")]
    Panicked {
        /// Panic payload rendered as text.
        message: String,
    },
}

impl UpdateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use mergeq::UpdateError;
    ///
    /// let err = UpdateError::Fail { error: "boom".into() };
    /// assert_eq!(err.as_label(), "update_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            UpdateError::Fail { .. } => "update_failed",
            UpdateError::Panicked { .. } => "update_panicked",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            UpdateError::Fail { error } => format!("error: {error}"),
            UpdateError::Panicked { message } => format!("panic: {message}"),
        }
    }
}

/// # Errors surfaced by a flush cycle.
///
/// Returned by [`flush`](crate::MergingQueue::flush) after the batch has run
/// to completion. Timer-driven flushes have no caller to return to; they
/// report through [`EventKind::UpdateFailed`](crate::EventKind) events
/// instead.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum QueueError {
    /// An update's action failed during the flush; the batch still completed.
    #[error("update '{update}' failed: {source}")]
    UpdateFailed {
        /// Identity of the failing update.
        update: Arc<str>,
        /// The underlying action error.
        source: UpdateError,
    },

    /// The execution runner lost the batch (e.g. its worker task was aborted).
    #[error("execution runner failed: {reason}")]
    ExecutorFailed {
        /// Description of the runner failure.
        reason: String,
    },
}

impl QueueError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use mergeq::{QueueError, UpdateError};
    ///
    /// let err = QueueError::UpdateFailed {
    ///     update: "repaint".into(),
    ///     source: UpdateError::Fail { error: "boom".into() },
    /// };
    /// assert_eq!(err.as_label(), "queue_update_failed");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            QueueError::UpdateFailed { .. } => "queue_update_failed",
            QueueError::ExecutorFailed { .. } => "queue_executor_failed",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            QueueError::UpdateFailed { update, source } => {
                format!("update={update}; {}", source.as_message())
            }
            QueueError::ExecutorFailed { reason } => format!("executor: {reason}"),
        }
    }
}
