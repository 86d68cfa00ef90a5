//! CAN Acquisition Engine
//!
//! Owns the bus transport, feeds received frames through the decoder into
//! the shared state store, forwards raw frames to the trace sink and to
//! observers, and keeps the bus alive with a counted restart policy.

mod config;
mod fault;
mod observer;
mod service;
mod worker;

pub use config::AcquisitionConfig;
pub use fault::{FaultCounter, LinkState, LinkStatus};
pub use observer::{BroadcastObserver, RawFrame, RawFrameObserver, SnifferLine};
pub use service::AcquisitionService;
pub use worker::{AcquisitionLoop, StepOutcome};

use can_protocol::TransportError;
use thiserror::Error;

/// Diagnostic event texts shown to the operator
pub mod messages {
    pub const NO_DATA: &str = "No CAN data received - check ECU connection";
    pub const BUS_ERROR: &str = "CAN bus communication error";
    pub const RECOVERED: &str = "CAN bus recovered";
    pub const RECOVERY_FAILED: &str = "CAN bus recovery failed";
}

/// Acquisition errors
#[derive(Debug, Error)]
pub enum AcquisitionError {
    #[error("CAN driver install failed: {0}")]
    Install(#[source] TransportError),

    #[error("CAN controller start failed: {0}")]
    Start(#[source] TransportError),

    #[error("Acquisition service not initialized")]
    NotInitialized,

    #[error("Acquisition worker already running")]
    AlreadyRunning,

    #[error("Acquisition worker not running")]
    NotRunning,

    #[error("Acquisition worker failed: {0}")]
    Worker(String),

    #[error("Invalid acquisition configuration: {0}")]
    InvalidConfig(String),
}
