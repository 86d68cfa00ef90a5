//! Acquisition Configuration

use crate::AcquisitionError;
use can_protocol::Bitrate;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and threshold settings for the acquisition loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Bus bitrate used at install
    pub bitrate: Bitrate,
    /// Bounded wait for each receive (ms)
    pub receive_timeout_ms: u64,
    /// Silence longer than this raises a staleness alert (ms)
    pub silence_window_ms: u64,
    /// Consecutive transport errors that trigger a restart
    pub error_threshold: u32,
    /// Pause between stop and start during a restart (ms)
    pub restart_cooldown_ms: u64,
    /// Pause after a failed restart (ms)
    pub failed_restart_cooldown_ms: u64,
    /// Pause after a transport error below the threshold (ms)
    pub error_backoff_ms: u64,
    /// Pause at the end of every iteration (ms)
    pub loop_yield_ms: u64,
    /// Emit a progress marker every N received frames
    pub progress_interval: u64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            bitrate: Bitrate::default(),
            receive_timeout_ms: 100,
            silence_window_ms: 5000,
            error_threshold: 5,
            restart_cooldown_ms: 1000,
            failed_restart_cooldown_ms: 5000,
            error_backoff_ms: 500,
            loop_yield_ms: 10,
            progress_interval: 50,
        }
    }
}

impl AcquisitionConfig {
    /// Reject settings the loop cannot run with
    pub fn validate(&self) -> Result<(), AcquisitionError> {
        if self.receive_timeout_ms == 0 {
            return Err(AcquisitionError::InvalidConfig(
                "receive_timeout_ms must be positive".to_string(),
            ));
        }
        if self.error_threshold == 0 {
            return Err(AcquisitionError::InvalidConfig(
                "error_threshold must be at least 1".to_string(),
            ));
        }
        if self.progress_interval == 0 {
            return Err(AcquisitionError::InvalidConfig(
                "progress_interval must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }

    pub fn silence_window(&self) -> Duration {
        Duration::from_millis(self.silence_window_ms)
    }

    pub fn restart_cooldown(&self) -> Duration {
        Duration::from_millis(self.restart_cooldown_ms)
    }

    pub fn failed_restart_cooldown(&self) -> Duration {
        Duration::from_millis(self.failed_restart_cooldown_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }

    pub fn loop_yield(&self) -> Duration {
        Duration::from_millis(self.loop_yield_ms)
    }
}
