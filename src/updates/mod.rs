//! # Update abstractions.
//!
//! This module provides the core update-related types:
//! - [`Update`] - one deduplicated unit of deferred work
//! - [`UpdateRef`] - shared reference to an update (`Arc<Update>`)
//! - [`HIGH_PRIORITY`] / [`DEFAULT_PRIORITY`] - priority constants

mod update;

pub use update::{DEFAULT_PRIORITY, HIGH_PRIORITY, Update, UpdateFuture, UpdateRef};
