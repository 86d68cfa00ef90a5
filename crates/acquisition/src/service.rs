//! Acquisition Service Lifecycle
//!
//! `init` installs the driver, `start` starts the controller and spawns the
//! worker, `stop` signals the worker and waits for it. Install or start
//! failures are returned to the caller and the worker never runs; the rest
//! of the process keeps reading the (disconnected) state.

use crate::fault::LinkStatus;
use crate::worker::AcquisitionLoop;
use crate::AcquisitionError;
use can_protocol::CanTransport;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

enum Stage<T: CanTransport> {
    Idle(AcquisitionLoop<T>),
    Running(JoinHandle<AcquisitionLoop<T>>),
    /// The worker panicked and took the loop with it
    Failed,
}

/// Owns the acquisition loop and its worker task
pub struct AcquisitionService<T: CanTransport + 'static> {
    stage: Stage<T>,
    initialized: bool,
    shutdown: Arc<AtomicBool>,
    status: LinkStatus,
}

impl<T: CanTransport + 'static> AcquisitionService<T> {
    pub fn new(acquisition: AcquisitionLoop<T>) -> Self {
        let status = acquisition.status();
        Self {
            stage: Stage::Idle(acquisition),
            initialized: false,
            shutdown: Arc::new(AtomicBool::new(false)),
            status,
        }
    }

    /// Validate the configuration and install the CAN driver
    pub async fn init(&mut self) -> Result<(), AcquisitionError> {
        let Stage::Idle(acquisition) = &mut self.stage else {
            return Err(AcquisitionError::AlreadyRunning);
        };
        if self.initialized {
            warn!("Acquisition service already initialized");
            return Ok(());
        }

        acquisition.config().validate()?;
        let bitrate = acquisition.config().bitrate;
        info!("Installing CAN driver at {} bit/s", bitrate.bits_per_second());
        acquisition
            .transport_mut()
            .install(bitrate)
            .await
            .map_err(|e| {
                error!("Failed to install CAN driver: {}", e);
                AcquisitionError::Install(e)
            })?;

        self.initialized = true;
        info!("CAN driver installed");
        Ok(())
    }

    /// Start the controller and spawn the worker
    pub async fn start(&mut self) -> Result<(), AcquisitionError> {
        if !self.initialized {
            return Err(AcquisitionError::NotInitialized);
        }
        let acquisition = match &mut self.stage {
            Stage::Idle(acquisition) => acquisition,
            Stage::Running(_) => return Err(AcquisitionError::AlreadyRunning),
            Stage::Failed => {
                return Err(AcquisitionError::Worker(
                    "acquisition loop was lost".to_string(),
                ))
            }
        };

        acquisition.transport_mut().start().await.map_err(|e| {
            error!("Failed to start CAN controller: {}", e);
            AcquisitionError::Start(e)
        })?;

        let Stage::Idle(acquisition) = std::mem::replace(&mut self.stage, Stage::Failed) else {
            return Err(AcquisitionError::AlreadyRunning);
        };
        self.shutdown.store(false, Ordering::Release);
        let worker = tokio::spawn(acquisition.run(self.shutdown.clone()));
        self.stage = Stage::Running(worker);
        info!("CAN acquisition started");
        Ok(())
    }

    /// Signal the worker and wait for it to stop the transport
    pub async fn stop(&mut self) -> Result<(), AcquisitionError> {
        if !matches!(self.stage, Stage::Running(_)) {
            return Err(AcquisitionError::NotRunning);
        }
        let Stage::Running(worker) = std::mem::replace(&mut self.stage, Stage::Failed) else {
            return Err(AcquisitionError::NotRunning);
        };

        info!("Stopping CAN acquisition");
        self.shutdown.store(true, Ordering::Release);
        match worker.await {
            Ok(acquisition) => {
                self.stage = Stage::Idle(acquisition);
                info!("CAN acquisition stopped");
                Ok(())
            }
            Err(e) => {
                error!("Acquisition worker failed: {}", e);
                Err(AcquisitionError::Worker(e.to_string()))
            }
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(&self.stage, Stage::Running(worker) if !worker.is_finished())
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Link health handle, valid before and after the worker runs
    pub fn status(&self) -> LinkStatus {
        self.status.clone()
    }

    /// The loop, while the worker is not running
    pub fn acquisition(&self) -> Option<&AcquisitionLoop<T>> {
        match &self.stage {
            Stage::Idle(acquisition) => Some(acquisition),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AcquisitionConfig;
    use can_protocol::{MockEvent, MockTransport};
    use ecu_state::EcuStateStore;
    use event_log::NullSink;
    use frame_decoder::FrameDecoder;

    fn service(transport: MockTransport) -> AcquisitionService<MockTransport> {
        AcquisitionService::new(AcquisitionLoop::new(
            transport,
            FrameDecoder::default(),
            Arc::new(EcuStateStore::new()),
            Arc::new(NullSink),
            AcquisitionConfig::default(),
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_requires_init() {
        let mut svc = service(MockTransport::scripted(Vec::<MockEvent>::new()));
        assert!(matches!(
            svc.start().await,
            Err(AcquisitionError::NotInitialized)
        ));
        assert!(matches!(svc.stop().await, Err(AcquisitionError::NotRunning)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lifecycle() {
        let transport = MockTransport::scripted(Vec::<MockEvent>::new());
        let handle = transport.handle();
        let mut svc = service(transport);

        svc.init().await.unwrap();
        svc.start().await.unwrap();
        assert!(svc.is_running());
        assert!(matches!(
            svc.start().await,
            Err(AcquisitionError::AlreadyRunning)
        ));

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        svc.stop().await.unwrap();
        assert!(!svc.is_running());
        assert_eq!(handle.install_calls(), 1);
        assert_eq!(handle.start_calls(), 1);
        assert_eq!(handle.stop_calls(), 1);

        // Restartable after stop
        svc.start().await.unwrap();
        svc.stop().await.unwrap();
        assert_eq!(handle.start_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_install_failure_is_reported() {
        let transport = MockTransport::scripted(Vec::<MockEvent>::new());
        transport.handle().fail_install();
        let mut svc = service(transport);

        assert!(matches!(svc.init().await, Err(AcquisitionError::Install(_))));
        assert!(!svc.is_initialized());
        assert!(matches!(
            svc.start().await,
            Err(AcquisitionError::NotInitialized)
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_start_failure_keeps_loop() {
        let transport = MockTransport::scripted(Vec::<MockEvent>::new());
        let handle = transport.handle();
        let mut svc = service(transport);
        svc.init().await.unwrap();

        handle.fail_next_starts(1);
        assert!(matches!(svc.start().await, Err(AcquisitionError::Start(_))));
        assert!(!svc.is_running());
        assert!(svc.acquisition().is_some());

        svc.start().await.unwrap();
        assert!(svc.is_running());
        svc.stop().await.unwrap();
    }
}
