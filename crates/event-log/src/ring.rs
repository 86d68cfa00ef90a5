//! Ring Buffer Event Log

use crate::{EventLogError, EventSink, LogEvent, Severity};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::debug;

/// Default capacity (matches the dashboard's data-stream panel)
pub const DEFAULT_CAPACITY: usize = 50;

/// Keeps the most recent events, overwriting the oldest when full
#[derive(Debug)]
pub struct EventLog {
    events: Mutex<VecDeque<LogEvent>>,
    capacity: usize,
    total_written: AtomicUsize,
    epoch: Instant,
}

impl EventLog {
    /// Create a log holding at most `capacity` events
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            events: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            total_written: AtomicUsize::new(0),
            epoch: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<LogEvent>> {
        // Each push completes before the guard drops, so the queue stays consistent
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Create a log with default capacity (50 events)
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Append an event (overwrites oldest if full)
    pub fn push(&self, severity: Severity, message: impl Into<String>) {
        let event = LogEvent {
            timestamp_ms: self.epoch.elapsed().as_millis() as u64,
            severity,
            message: message.into(),
        };

        let mut events = self.lock();
        while events.len() >= self.capacity {
            events.pop_front();
        }
        events.push_back(event);
        self.total_written.fetch_add(1, Ordering::Relaxed);
    }

    /// Read the last N events (most recent first)
    pub fn recent(&self, count: usize) -> Vec<LogEvent> {
        let events = self.lock();
        events.iter().rev().take(count).cloned().collect()
    }

    /// Number of events currently held
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if the log is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Get the log capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total events ever written (for statistics)
    pub fn total_written(&self) -> usize {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Render the held events as a JSON array, most recent first
    pub fn to_json(&self) -> Result<String, EventLogError> {
        Ok(serde_json::to_string(&self.recent(self.capacity))?)
    }

    /// Clear the log
    pub fn clear(&self) {
        self.lock().clear();
        debug!("Event log cleared");
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

impl EventSink for EventLog {
    fn log_event(&self, severity: Severity, message: &str) {
        self.push(severity, message);
    }
}
