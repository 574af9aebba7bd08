//! Queue events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to events emitted by the merging queue.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: [`MergingQueue`](crate::MergingQueue) (intake, flush,
//!   lifecycle paths).
//! - **Consumers**: the subscriber listener spawned by
//!   [`QueueBuilder`](crate::QueueBuilder) (fans out to a
//!   [`SubscriberSet`](crate::SubscriberSet)), plus any raw receiver obtained
//!   via [`MergingQueue::subscribe`](crate::MergingQueue::subscribe).

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
