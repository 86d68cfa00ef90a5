//! Diagnostic Event Log
//!
//! Operator-facing stream of short, severity-tagged messages such as
//! "CAN bus recovered". Producers only ever call [`EventSink::log_event`];
//! the ring buffer behind it is an implementation detail.

mod ring;

pub use ring::{EventLog, DEFAULT_CAPACITY};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Event severity shown to the operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Success,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Severity::Info => "INFO",
            Severity::Warning => "WARNING",
            Severity::Success => "SUCCESS",
            Severity::Error => "ERROR",
        };
        f.write_str(label)
    }
}

/// One entry in the event log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    /// Milliseconds since the log was created
    pub timestamp_ms: u64,
    pub severity: Severity,
    pub message: String,
}

/// Event log errors
#[derive(Debug, Error)]
pub enum EventLogError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// One-way diagnostic event reporting
pub trait EventSink: Send + Sync {
    fn log_event(&self, severity: Severity, message: &str);
}

impl<T: EventSink + ?Sized> EventSink for Arc<T> {
    fn log_event(&self, severity: Severity, message: &str) {
        (**self).log_event(severity, message)
    }
}

/// Sink that drops every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn log_event(&self, _severity: Severity, _message: &str) {}
}
