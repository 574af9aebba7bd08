//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints queue events to stdout in a human-readable format.
//! This is primarily useful for development, debugging, and examples.
//!
//! ## Output format
//! ```text
//! [enqueued] queue=fs-watch update=reindex
//! [merged] queue=fs-watch update=reindex
//! [eaten] queue=fs-watch update=repaint-line by=repaint-all
//! [flush-started] queue=fs-watch batch=3
//! [update-failed] queue=fs-watch update=reindex err="stale root"
//! [flush-completed] queue=fs-watch batch=3
//! [disposed] queue=fs-watch
//! ```

use async_trait::async_trait;

use crate::events::{Event, EventKind};

use super::Subscribe;

/// Simple stdout logging subscriber.
///
/// Enabled via the `logging` feature. Prints human-readable event
/// descriptions to stdout for debugging and demonstration purposes.
///
/// Not intended for production use - implement a custom [`Subscribe`] for
/// structured logging or metrics collection.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    fn label<'a>(field: &'a Option<std::sync::Arc<str>>) -> &'a str {
        field.as_deref().unwrap_or("?")
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let queue = Self::label(&e.queue);
        match e.kind {
            EventKind::Enqueued => {
                println!("[enqueued] queue={queue} update={}", Self::label(&e.update));
            }
            EventKind::Merged => {
                println!("[merged] queue={queue} update={}", Self::label(&e.update));
            }
            EventKind::Eaten => {
                println!(
                    "[eaten] queue={queue} update={} by={}",
                    Self::label(&e.update),
                    Self::label(&e.reason)
                );
            }
            EventKind::Rejected => {
                println!("[rejected] queue={queue} update={}", Self::label(&e.update));
            }
            EventKind::FlushStarted => {
                println!(
                    "[flush-started] queue={queue} batch={}",
                    e.batch_len.unwrap_or(0)
                );
            }
            EventKind::FlushCompleted => {
                println!(
                    "[flush-completed] queue={queue} batch={}",
                    e.batch_len.unwrap_or(0)
                );
            }
            EventKind::UpdateExpired => {
                println!("[expired] queue={queue} update={}", Self::label(&e.update));
            }
            EventKind::UpdateFailed => {
                println!(
                    "[update-failed] queue={queue} update={} err={:?}",
                    Self::label(&e.update),
                    Self::label(&e.reason)
                );
            }
            EventKind::Activated => {
                println!("[activated] queue={queue}");
            }
            EventKind::Deactivated => {
                println!("[deactivated] queue={queue}");
            }
            EventKind::Disposed => {
                println!("[disposed] queue={queue}");
            }
        }
    }

    fn name(&self) -> &'static str {
        "log_writer"
    }
}
