//! Mock CAN Transport
//!
//! Replays a script of receive outcomes for tests, or synthesizes plausible
//! engine traffic when no adapter is attached (dashboard demo mode).

use crate::bitrate::Bitrate;
use crate::error::TransportError;
use crate::frame::CanFrame;
use crate::transport::CanTransport;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Interval between synthesized frames in simulated mode
const SIMULATED_FRAME_INTERVAL_MS: u64 = 20;

/// One scripted receive outcome
#[derive(Debug, Clone)]
pub enum MockEvent {
    /// A frame arrives immediately
    Frame(CanFrame),
    /// The bounded wait elapses with no frame
    Timeout,
    /// The controller reports a fault
    Error(String),
}

/// Call counters shared between a mock transport and the test observing it
#[derive(Debug, Default)]
struct MockStats {
    install_calls: AtomicUsize,
    start_calls: AtomicUsize,
    stop_calls: AtomicUsize,
    pending_start_failures: AtomicUsize,
    fail_install: AtomicUsize,
}

/// Handle for inspecting and steering a [`MockTransport`] after it was moved
#[derive(Debug, Clone)]
pub struct MockHandle {
    stats: Arc<MockStats>,
}

impl MockHandle {
    /// Number of `install` calls
    pub fn install_calls(&self) -> usize {
        self.stats.install_calls.load(Ordering::SeqCst)
    }

    /// Number of `start` calls (successful or not)
    pub fn start_calls(&self) -> usize {
        self.stats.start_calls.load(Ordering::SeqCst)
    }

    /// Number of `stop` calls
    pub fn stop_calls(&self) -> usize {
        self.stats.stop_calls.load(Ordering::SeqCst)
    }

    /// Make the next `count` calls to `start` fail
    pub fn fail_next_starts(&self, count: usize) {
        self.stats
            .pending_start_failures
            .store(count, Ordering::SeqCst);
    }

    /// Make every `install` call fail
    pub fn fail_install(&self) {
        self.stats.fail_install.store(1, Ordering::SeqCst);
    }
}

enum Mode {
    Scripted(VecDeque<MockEvent>),
    Simulated { tick: u64 },
}

/// Mock bus controller
pub struct MockTransport {
    mode: Mode,
    installed: bool,
    running: bool,
    stats: Arc<MockStats>,
}

impl MockTransport {
    /// Create a transport that replays `events`, then stays silent
    pub fn scripted(events: impl IntoIterator<Item = MockEvent>) -> Self {
        Self::with_mode(Mode::Scripted(events.into_iter().collect()))
    }

    /// Create a transport that synthesizes engine traffic
    pub fn simulated() -> Self {
        info!("Creating simulated CAN transport");
        Self::with_mode(Mode::Simulated { tick: 0 })
    }

    fn with_mode(mode: Mode) -> Self {
        Self {
            mode,
            installed: false,
            running: false,
            stats: Arc::new(MockStats::default()),
        }
    }

    /// Get a handle to the shared call counters
    pub fn handle(&self) -> MockHandle {
        MockHandle {
            stats: Arc::clone(&self.stats),
        }
    }

    /// Queue more scripted events (ignored in simulated mode)
    pub fn push(&mut self, event: MockEvent) {
        if let Mode::Scripted(events) = &mut self.mode {
            events.push_back(event);
        }
    }

    /// Build the next synthesized frame
    fn simulate_frame(tick: u64) -> Result<CanFrame, TransportError> {
        let t = tick as f64 * 0.1;
        let wave = |base: f64, amp: f64, freq: f64| base + amp * (t * freq).sin();

        // Cycle through the monitored identifiers
        match tick % 7 {
            0 => {
                let rpm = wave(2500.0, 1200.0, 0.5).clamp(0.0, 8000.0);
                let raw = (rpm / 0.25) as u16;
                let tps = (wave(35.0, 30.0, 0.3) / 0.3937) as u8;
                let pedal = (wave(35.0, 30.0, 0.3) / 0.4) as u8;
                let torque = (wave(40.0, 25.0, 0.7) / 0.3937) as u8;
                CanFrame::new(
                    0x280,
                    &[0, 0, (raw >> 8) as u8, raw as u8, pedal, torque, 0, tps],
                )
            }
            1 => {
                let raw = (wave(150.0, 60.0, 0.8) / 0.01) as u16;
                CanFrame::new(0x580, &[0, 0, (raw >> 8) as u8, raw as u8])
            }
            2 => {
                let set = (wave(40.0, 30.0, 0.6) * 2.0) as u8;
                let pos = (wave(38.0, 30.0, 0.6) * 2.0) as u8;
                CanFrame::new(0x390, &[0, set, pos])
            }
            3 => {
                let bov = (wave(20.0, 15.0, 1.8) / 50.0 * 255.0) as u8;
                CanFrame::new(0x394, &[bov])
            }
            4 => {
                let req = (wave(45.0, 20.0, 0.7) / 0.39) as u8;
                let act = (wave(43.0, 20.0, 0.7) / 0.39) as u8;
                CanFrame::new(0x488, &[0, req, act])
            }
            5 => {
                let limit = (wave(80.0, 10.0, 0.2) / 0.4) as u8;
                CanFrame::new(0x288, &[0, 0, 0, 0, 0, limit])
            }
            _ => {
                let flags = if tick % 700 == 6 { 0x01 } else { 0x00 };
                CanFrame::new(0x206, &[flags])
            }
        }
    }
}

impl CanTransport for MockTransport {
    async fn install(&mut self, bitrate: Bitrate) -> Result<(), TransportError> {
        self.stats.install_calls.fetch_add(1, Ordering::SeqCst);
        if self.stats.fail_install.load(Ordering::SeqCst) > 0 {
            return Err(TransportError::Install("mock install failure".to_string()));
        }
        debug!("Mock transport installed at {} bit/s", bitrate.bits_per_second());
        self.installed = true;
        Ok(())
    }

    async fn start(&mut self) -> Result<(), TransportError> {
        self.stats.start_calls.fetch_add(1, Ordering::SeqCst);
        if !self.installed {
            return Err(TransportError::NotInstalled);
        }
        if self.running {
            warn!("Mock transport already running");
            return Ok(());
        }

        let pending = self.stats.pending_start_failures.load(Ordering::SeqCst);
        if pending > 0 {
            self.stats
                .pending_start_failures
                .store(pending - 1, Ordering::SeqCst);
            return Err(TransportError::Start("mock start failure".to_string()));
        }

        self.running = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), TransportError> {
        self.stats.stop_calls.fetch_add(1, Ordering::SeqCst);
        if !self.running {
            warn!("Mock transport not running");
            return Ok(());
        }
        self.running = false;
        Ok(())
    }

    async fn receive(&mut self, timeout: Duration) -> Result<CanFrame, TransportError> {
        if !self.running {
            return Err(TransportError::NotRunning);
        }

        let timeout_ms = timeout.as_millis() as u64;
        match &mut self.mode {
            Mode::Scripted(events) => match events.pop_front() {
                Some(MockEvent::Frame(frame)) => Ok(frame),
                Some(MockEvent::Error(msg)) => Err(TransportError::BusError(msg)),
                Some(MockEvent::Timeout) | None => {
                    tokio::time::sleep(timeout).await;
                    Err(TransportError::Timeout(timeout_ms))
                }
            },
            Mode::Simulated { tick } => {
                let interval = Duration::from_millis(SIMULATED_FRAME_INTERVAL_MS);
                if interval > timeout {
                    tokio::time::sleep(timeout).await;
                    return Err(TransportError::Timeout(timeout_ms));
                }
                tokio::time::sleep(interval).await;
                let frame = Self::simulate_frame(*tick)?;
                *tick += 1;
                Ok(frame)
            }
        }
    }

    fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(id: u32) -> CanFrame {
        CanFrame::new(id, &[0x01]).unwrap()
    }

    async fn started(events: Vec<MockEvent>) -> MockTransport {
        let mut transport = MockTransport::scripted(events);
        transport.install(Bitrate::K500).await.unwrap();
        transport.start().await.unwrap();
        transport
    }

    #[tokio::test(start_paused = true)]
    async fn test_scripted_replay_then_silence() {
        let mut transport = started(vec![
            MockEvent::Frame(frame(0x280)),
            MockEvent::Error("bus off".into()),
        ])
        .await;
        let timeout = Duration::from_millis(100);

        assert_eq!(transport.receive(timeout).await.unwrap().id(), 0x280);
        assert!(matches!(
            transport.receive(timeout).await,
            Err(TransportError::BusError(_))
        ));
        assert!(transport.receive(timeout).await.unwrap_err().is_timeout());
    }

    #[tokio::test]
    async fn test_start_requires_install() {
        let mut transport = MockTransport::scripted(Vec::new());
        assert!(matches!(
            transport.start().await,
            Err(TransportError::NotInstalled)
        ));
    }

    #[tokio::test]
    async fn test_receive_when_stopped_is_a_fault() {
        let mut transport = started(vec![MockEvent::Frame(frame(0x280))]).await;
        transport.stop().await.unwrap();
        let err = transport
            .receive(Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::NotRunning));
    }

    #[tokio::test]
    async fn test_injected_start_failures() {
        let mut transport = started(Vec::new()).await;
        let handle = transport.handle();
        transport.stop().await.unwrap();

        handle.fail_next_starts(1);
        assert!(transport.start().await.is_err());
        assert!(transport.start().await.is_ok());
        assert_eq!(handle.start_calls(), 3);
        assert_eq!(handle.stop_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_traffic_cycles_identifiers() {
        let mut transport = MockTransport::simulated();
        transport.install(Bitrate::K500).await.unwrap();
        transport.start().await.unwrap();

        let mut ids = Vec::new();
        for _ in 0..7 {
            ids.push(transport.receive(Duration::from_millis(100)).await.unwrap().id());
        }
        assert_eq!(ids, vec![0x280, 0x580, 0x390, 0x394, 0x488, 0x288, 0x206]);
    }
}
