//! Fault Tracking and Link Status

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Loop-local error and silence bookkeeping
#[derive(Debug, Clone)]
pub struct FaultCounter {
    consecutive_errors: u32,
    last_frame_at: Instant,
}

impl FaultCounter {
    /// Start counting silence from `now`
    pub fn new(now: Instant) -> Self {
        Self {
            consecutive_errors: 0,
            last_frame_at: now,
        }
    }

    /// A frame arrived
    pub fn record_success(&mut self, now: Instant) {
        self.consecutive_errors = 0;
        self.last_frame_at = now;
    }

    /// A transport fault occurred; returns the new consecutive count
    pub fn record_error(&mut self) -> u32 {
        self.consecutive_errors = self.consecutive_errors.saturating_add(1);
        self.consecutive_errors
    }

    /// Clear the error count after a successful restart
    pub fn reset_errors(&mut self) {
        self.consecutive_errors = 0;
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.consecutive_errors
    }

    /// Whether the bus has been silent for longer than `window`
    pub fn silence_exceeded(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.last_frame_at) > window
    }

    /// Restart the silence clock so one gap raises one alert
    pub fn reset_silence(&mut self, now: Instant) {
        self.last_frame_at = now;
    }
}

/// Health of the bus link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkState {
    /// Normal polling
    Running,
    /// Transport errors counted, threshold not yet reached
    Degraded,
    /// Transport being restarted
    Recovering,
}

impl LinkState {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => LinkState::Degraded,
            2 => LinkState::Recovering,
            _ => LinkState::Running,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            LinkState::Running => 0,
            LinkState::Degraded => 1,
            LinkState::Recovering => 2,
        }
    }
}

#[derive(Debug, Default)]
struct LinkStatusInner {
    state: AtomicU8,
    stale: AtomicBool,
    consecutive_errors: AtomicU32,
    frames_received: AtomicU64,
    restart_count: AtomicU64,
}

/// Read-only view of the loop's link health, cheap to clone
///
/// Written only by the acquisition worker.
#[derive(Debug, Clone, Default)]
pub struct LinkStatus {
    inner: Arc<LinkStatusInner>,
}

impl LinkStatus {
    pub fn state(&self) -> LinkState {
        LinkState::from_u8(self.inner.state.load(Ordering::Acquire))
    }

    /// Whether the silence window elapsed since the last frame
    pub fn is_stale(&self) -> bool {
        self.inner.stale.load(Ordering::Acquire)
    }

    pub fn consecutive_errors(&self) -> u32 {
        self.inner.consecutive_errors.load(Ordering::Relaxed)
    }

    pub fn frames_received(&self) -> u64 {
        self.inner.frames_received.load(Ordering::Relaxed)
    }

    /// Number of stop/start cycles attempted
    pub fn restart_count(&self) -> u64 {
        self.inner.restart_count.load(Ordering::Relaxed)
    }

    pub(crate) fn set_state(&self, state: LinkState) {
        self.inner.state.store(state.as_u8(), Ordering::Release);
    }

    pub(crate) fn set_stale(&self, stale: bool) {
        self.inner.stale.store(stale, Ordering::Release);
    }

    pub(crate) fn set_consecutive_errors(&self, count: u32) {
        self.inner.consecutive_errors.store(count, Ordering::Relaxed);
    }

    /// Returns the new total
    pub(crate) fn count_frame(&self) -> u64 {
        self.inner.frames_received.fetch_add(1, Ordering::Relaxed) + 1
    }

    pub(crate) fn count_restart(&self) {
        self.inner.restart_count.fetch_add(1, Ordering::Relaxed);
    }
}
