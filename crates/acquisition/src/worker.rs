//! Acquisition Loop
//!
//! One iteration: bounded receive, then one of three branches (frame,
//! timeout, fault), then a short yield. The loop is the only writer of the
//! state store and the only user of the transport.

use crate::config::AcquisitionConfig;
use crate::fault::{FaultCounter, LinkState, LinkStatus};
use crate::messages;
use crate::observer::RawFrameObserver;
use can_protocol::{CanFrame, CanTransport, TransportError};
use ecu_state::EcuStateStore;
use event_log::{EventSink, Severity};
use frame_decoder::{ids, FrameDecoder};
use metrics::counter;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::time::{sleep, Instant};
use trace_log::{TraceRecord, TraceSink};
use tracing::{debug, error, info, warn};

/// What one loop iteration did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// A frame arrived; `applied` fields were written, `rejected` samples dropped
    Frame {
        id: u32,
        applied: usize,
        rejected: usize,
    },
    /// Receive timed out within the silence window
    Idle,
    /// Receive timed out and the silence window elapsed
    Stale,
    /// Transport fault below the restart threshold
    Fault { consecutive: u32 },
    /// Threshold reached, restart succeeded
    Recovered,
    /// Threshold reached, restart failed
    RecoveryFailed,
}

/// The acquisition worker
pub struct AcquisitionLoop<T: CanTransport> {
    transport: T,
    decoder: FrameDecoder,
    store: Arc<EcuStateStore>,
    events: Arc<dyn EventSink>,
    trace: Option<Arc<dyn TraceSink>>,
    observers: Vec<Arc<dyn RawFrameObserver>>,
    config: AcquisitionConfig,
    faults: FaultCounter,
    status: LinkStatus,
}

impl<T: CanTransport> AcquisitionLoop<T> {
    /// Create a loop around an installed or uninstalled transport
    pub fn new(
        transport: T,
        decoder: FrameDecoder,
        store: Arc<EcuStateStore>,
        events: Arc<dyn EventSink>,
        config: AcquisitionConfig,
    ) -> Self {
        info!(
            "Creating acquisition loop: timeout {} ms, restart after {} errors",
            config.receive_timeout_ms, config.error_threshold
        );
        Self {
            transport,
            decoder,
            store,
            events,
            trace: None,
            observers: Vec::new(),
            config,
            faults: FaultCounter::new(Instant::now()),
            status: LinkStatus::default(),
        }
    }

    /// Forward raw frames to a trace sink while it is enabled
    pub fn with_trace_sink(mut self, trace: Arc<dyn TraceSink>) -> Self {
        self.trace = Some(trace);
        self
    }

    /// Register a raw frame observer
    pub fn with_observer(mut self, observer: Arc<dyn RawFrameObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Handle to the link health, readable from other tasks
    pub fn status(&self) -> LinkStatus {
        self.status.clone()
    }

    pub fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub(crate) fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Start counting silence from now
    pub(crate) fn reset_silence(&mut self) {
        self.faults.reset_silence(Instant::now());
    }

    /// Run one iteration, including the trailing yield
    pub async fn step(&mut self) -> StepOutcome {
        let outcome = match self.transport.receive(self.config.receive_timeout()).await {
            Ok(frame) => self.handle_frame(frame),
            Err(e) if e.is_timeout() => self.handle_timeout(),
            Err(e) => self.handle_fault(e).await,
        };

        sleep(self.config.loop_yield()).await;
        outcome
    }

    /// Iterate until `shutdown` is set, then stop the transport
    pub async fn run(mut self, shutdown: Arc<AtomicBool>) -> Self {
        info!("Starting CAN acquisition loop");
        self.reset_silence();

        while !shutdown.load(Ordering::Acquire) {
            self.step().await;
        }

        if let Err(e) = self.transport.stop().await {
            warn!("Failed to stop CAN transport: {}", e);
        }
        self.store.set_connected(false);
        info!(
            "CAN acquisition loop stopped after {} frames",
            self.status.frames_received()
        );
        self
    }

    fn handle_frame(&mut self, frame: CanFrame) -> StepOutcome {
        let id = frame.id();
        self.faults.record_success(Instant::now());
        self.status.set_consecutive_errors(0);
        self.status.set_state(LinkState::Running);
        if self.status.is_stale() {
            info!("CAN traffic resumed with ID 0x{:03X}", id);
            self.status.set_stale(false);
        }
        self.store.set_connected(true);
        let count = self.status.count_frame();
        counter!("ecu_can_frames_received_total").increment(1);

        let samples = self.decoder.decode(&frame);
        if samples.is_empty() && !self.decoder.is_known(id) {
            debug!("Ignoring CAN ID 0x{:03X}", id);
        }

        let mut rejected = 0;
        for sample in samples.iter().filter(|s| !s.valid) {
            rejected += 1;
            counter!("ecu_can_samples_rejected_total").increment(1);
            warn!(
                "Rejected {} = {:.2} {} from ID 0x{:03X}",
                sample.channel,
                sample.value,
                sample.channel.unit(),
                id
            );
        }
        let applied = self.store.update(&samples);

        self.forward_to_trace(&frame);
        for observer in &self.observers {
            observer.on_raw_frame(id, frame.payload());
        }

        if count.checked_rem(self.config.progress_interval) == Some(0)
            && (id == ids::ENGINE_1 || id == ids::MANIFOLD)
        {
            let message = format!("CAN: ID=0x{:03X}, {} messages processed", id, count);
            info!("{}", message);
            self.events.log_event(Severity::Info, &message);
        }

        StepOutcome::Frame {
            id,
            applied,
            rejected,
        }
    }

    fn forward_to_trace(&self, frame: &CanFrame) {
        let Some(trace) = &self.trace else {
            return;
        };
        if !trace.is_enabled() {
            return;
        }

        let line = TraceRecord::from_frame(self.store.uptime_ms(), frame).to_line();
        if let Err(e) = trace.append_line(&line) {
            counter!("ecu_can_trace_write_failures_total").increment(1);
            warn!("Trace append failed for ID 0x{:03X}: {}", frame.id(), e);
        }
    }

    fn handle_timeout(&mut self) -> StepOutcome {
        let now = Instant::now();
        if !self.faults.silence_exceeded(now, self.config.silence_window()) {
            return StepOutcome::Idle;
        }

        warn!(
            "No CAN messages received for {} seconds",
            self.config.silence_window_ms / 1000
        );
        self.events.log_event(Severity::Warning, messages::NO_DATA);
        self.status.set_stale(true);
        self.store.set_connected(false);
        self.faults.reset_silence(now);
        StepOutcome::Stale
    }

    async fn handle_fault(&mut self, err: TransportError) -> StepOutcome {
        let consecutive = self.faults.record_error();
        self.status.set_consecutive_errors(consecutive);
        counter!("ecu_can_receive_errors_total").increment(1);
        warn!("CAN receive error ({} consecutive): {}", consecutive, err);
        self.events.log_event(Severity::Warning, messages::BUS_ERROR);

        if consecutive < self.config.error_threshold {
            self.status.set_state(LinkState::Degraded);
            sleep(self.config.error_backoff()).await;
            return StepOutcome::Fault { consecutive };
        }

        self.restart().await
    }

    async fn restart(&mut self) -> StepOutcome {
        error!(
            "Too many CAN errors ({}), restarting CAN bus",
            self.faults.consecutive_errors()
        );
        self.status.set_state(LinkState::Recovering);
        self.status.count_restart();
        counter!("ecu_can_bus_restarts_total").increment(1);
        self.store.set_connected(false);

        if let Err(e) = self.transport.stop().await {
            warn!("CAN stop during restart failed: {}", e);
        }
        sleep(self.config.restart_cooldown()).await;

        match self.transport.start().await {
            Ok(()) => {
                self.faults.reset_errors();
                self.status.set_consecutive_errors(0);
                self.status.set_state(LinkState::Running);
                info!("CAN bus recovered");
                self.events.log_event(Severity::Success, messages::RECOVERED);
                StepOutcome::Recovered
            }
            Err(e) => {
                error!("CAN bus recovery failed: {}", e);
                self.events
                    .log_event(Severity::Error, messages::RECOVERY_FAILED);
                sleep(self.config.failed_restart_cooldown()).await;
                StepOutcome::RecoveryFailed
            }
        }
    }
}
