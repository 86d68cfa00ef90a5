//! Lock-Guarded State Store

use crate::state::EcuState;
use frame_decoder::ChannelSample;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Owner of the single [`EcuState`] record
///
/// The lock is held only while copying plain values in or out, never across
/// I/O. Share it behind an `Arc`.
#[derive(Debug)]
pub struct EcuStateStore {
    state: Mutex<EcuState>,
    epoch: Instant,
}

impl EcuStateStore {
    /// Create a store with every field at its default
    pub fn new() -> Self {
        info!("Creating ECU state store");
        Self {
            state: Mutex::new(EcuState::default()),
            epoch: Instant::now(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EcuState> {
        // Writers assign the whole record at once; a poisoned value is still whole
        self.state.lock().unwrap_or_else(|poisoned| {
            warn!("ECU state lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Apply every valid sample of one decode pass
    ///
    /// Returns the number of fields written. When no sample is valid nothing
    /// changes, including the timestamp and sequence.
    pub fn update(&self, samples: &[ChannelSample]) -> usize {
        let elapsed_ms = self.epoch.elapsed().as_millis() as u64;

        let mut state = self.lock();
        let mut next = *state;
        let mut written = 0;
        for sample in samples.iter().filter(|s| s.valid) {
            next.apply(sample);
            written += 1;
        }
        if written == 0 {
            return 0;
        }

        next.timestamp_ms = elapsed_ms.max(state.timestamp_ms);
        next.sequence = state.sequence + 1;
        next.connected = true;
        *state = next;
        drop(state);

        debug!("Applied {} samples to ECU state", written);
        written
    }

    /// Set the bus connectivity flag
    pub fn set_connected(&self, connected: bool) {
        let mut state = self.lock();
        if state.connected != connected {
            state.connected = connected;
            drop(state);
            debug!("ECU state connected: {}", connected);
        }
    }

    /// Copy of the whole record
    pub fn snapshot(&self) -> EcuState {
        *self.lock()
    }

    /// Milliseconds since the store was created
    pub fn uptime_ms(&self) -> u64 {
        self.epoch.elapsed().as_millis() as u64
    }
}

impl Default for EcuStateStore {
    fn default() -> Self {
        Self::new()
    }
}
