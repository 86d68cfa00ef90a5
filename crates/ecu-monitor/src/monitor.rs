//! Monitor Wiring and Reporting

use crate::settings::Settings;
use acquisition::{
    AcquisitionLoop, AcquisitionService, LinkStatus, RawFrameObserver, SnifferLine,
};
use can_protocol::CanTransport;
use ecu_state::{EcuState, EcuStateStore};
use event_log::{EventLog, EventSink, Severity};
use frame_decoder::{FrameDecoder, ValidationError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use trace_log::{FileTraceSink, TraceError};
use tracing::{debug, error, info, warn};

/// Logs every raw frame at DEBUG in sniffer format
#[derive(Debug)]
pub struct TerminalObserver {
    epoch: Instant,
}

impl TerminalObserver {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }
}

impl Default for TerminalObserver {
    fn default() -> Self {
        Self::new()
    }
}

impl RawFrameObserver for TerminalObserver {
    fn on_raw_frame(&self, id: u32, payload: &[u8]) {
        let elapsed_ms = self.epoch.elapsed().as_millis() as u64;
        debug!(target: "sniffer", "{}", SnifferLine::new(elapsed_ms, id, payload));
    }
}

/// One-line summary of the state and link health
pub fn format_snapshot(state: &EcuState, link: &LinkStatus) -> String {
    format!(
        "rpm={:.0} map={:.1}kPa tps={:.1}% pedal={:.1}% wg={:.1}/{:.1}% bov={:.1}% \
         torque={:.0}Nm tcu={:.0}/{:.0}Nm limit={:.0}Nm tcu_status={:?} \
         link={:?} stale={} connected={} frames={} restarts={}",
        state.engine_rpm,
        state.manifold_kpa,
        state.throttle_pct,
        state.pedal_pct,
        state.wastegate_set_pct,
        state.wastegate_pos_pct,
        state.bov_pct,
        state.engine_torque_target_nm,
        state.tcu_torque_request_nm,
        state.tcu_torque_actual_nm,
        state.torque_limit_nm,
        state.tcu_status(),
        link.state(),
        link.is_stale(),
        state.connected,
        link.frames_received(),
        link.restart_count(),
    )
}

/// The running acquisition stack
pub struct Monitor<T: CanTransport + 'static> {
    service: AcquisitionService<T>,
    store: Arc<EcuStateStore>,
    events: Arc<EventLog>,
    trace: Option<(Arc<FileTraceSink>, JoinHandle<Result<u64, TraceError>>)>,
    report_interval: Duration,
}

impl<T: CanTransport + 'static> Monitor<T> {
    /// Assemble store, event log, trace file and acquisition loop; must be
    /// called inside a runtime
    pub fn build(transport: T, settings: &Settings) -> Result<Self, ValidationError> {
        let store = Arc::new(EcuStateStore::new());
        let events = Arc::new(EventLog::new(settings.event_log_capacity));
        let decoder = FrameDecoder::new(settings.decoder.clone(), settings.validation.clone())?;

        let mut acquisition = AcquisitionLoop::new(
            transport,
            decoder,
            store.clone(),
            events.clone(),
            settings.acquisition.clone(),
        )
        .with_observer(Arc::new(TerminalObserver::new()));

        let trace = if settings.trace.available {
            let (sink, writer) = FileTraceSink::spawn(
                &settings.trace.path,
                settings.trace.queue_capacity,
                settings.trace.enabled,
            );
            let sink = Arc::new(sink);
            acquisition = acquisition.with_trace_sink(sink.clone());
            Some((sink, writer))
        } else {
            None
        };

        Ok(Self {
            service: AcquisitionService::new(acquisition),
            store,
            events,
            trace,
            report_interval: Duration::from_millis(settings.report_interval_ms.max(1)),
        })
    }

    /// Initialize and start acquisition
    ///
    /// A failure is logged and reported to the event log; the monitor keeps
    /// serving the disconnected state.
    pub async fn start(&mut self) -> bool {
        let result = match self.service.init().await {
            Ok(()) => self.service.start().await,
            Err(e) => Err(e),
        };
        match result {
            Ok(()) => {
                self.events
                    .log_event(Severity::Success, "CAN bus initialized");
                true
            }
            Err(e) => {
                error!("CAN acquisition unavailable: {}", e);
                self.events
                    .log_event(Severity::Error, "CAN bus initialization failed");
                false
            }
        }
    }

    /// Current state summary
    pub fn report(&self) -> String {
        format_snapshot(&self.store.snapshot(), &self.service.status())
    }

    pub fn report_interval(&self) -> Duration {
        self.report_interval
    }

    pub fn store(&self) -> &Arc<EcuStateStore> {
        &self.store
    }

    pub fn events(&self) -> &Arc<EventLog> {
        &self.events
    }

    /// Runtime trace switch
    pub fn trace_sink(&self) -> Option<&Arc<FileTraceSink>> {
        self.trace.as_ref().map(|(sink, _)| sink)
    }

    pub fn is_running(&self) -> bool {
        self.service.is_running()
    }

    /// Stop acquisition and flush the trace file
    pub async fn shutdown(mut self) {
        if self.service.is_running() {
            if let Err(e) = self.service.stop().await {
                warn!("Error stopping acquisition: {}", e);
            }
        }
        // The writer finishes once the loop's handle on the sink is gone
        drop(self.service);

        if let Some((sink, writer)) = self.trace.take() {
            drop(sink);
            match writer.await {
                Ok(Ok(lines)) => info!("Trace file closed, {} lines written", lines),
                Ok(Err(e)) => warn!("Trace writer failed: {}", e),
                Err(e) => warn!("Trace writer task failed: {}", e),
            }
        }
    }
}
