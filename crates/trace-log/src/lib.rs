//! Raw Frame Trace
//!
//! One text line per received frame, appended to persistent storage while
//! tracing is switched on. The acquisition loop only sees [`TraceSink`].

mod file;
mod record;

pub use file::{FileTraceSink, DEFAULT_QUEUE_CAPACITY};
pub use record::TraceRecord;

use std::sync::Arc;
use thiserror::Error;

/// Trace errors
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Trace queue is full, line dropped")]
    Backpressure,
    #[error("Trace writer has stopped")]
    Closed,
    #[error("Trace I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Destination for trace lines
pub trait TraceSink: Send + Sync {
    /// Whether lines should be produced at all
    fn is_enabled(&self) -> bool;

    /// Append one already formatted line; must not block
    fn append_line(&self, line: &str) -> Result<(), TraceError>;
}

impl<T: TraceSink + ?Sized> TraceSink for Arc<T> {
    fn is_enabled(&self) -> bool {
        (**self).is_enabled()
    }

    fn append_line(&self, line: &str) -> Result<(), TraceError> {
        (**self).append_line(line)
    }
}
