//! CAN Transport Error Types

use thiserror::Error;

/// Errors reported by a CAN transport
#[derive(Debug, Error)]
pub enum TransportError {
    /// Driver installation failed
    #[error("Failed to install CAN driver: {0}")]
    Install(String),

    /// Controller failed to start
    #[error("Failed to start CAN controller: {0}")]
    Start(String),

    /// Controller failed to stop
    #[error("Failed to stop CAN controller: {0}")]
    Stop(String),

    /// Start requested before install
    #[error("CAN driver not installed")]
    NotInstalled,

    /// Receive requested while the controller is stopped
    #[error("CAN bus not running")]
    NotRunning,

    /// No frame arrived within the bounded wait
    #[error("Timeout waiting for CAN frame after {0}ms")]
    Timeout(u64),

    /// Controller or bus fault
    #[error("CAN bus error: {0}")]
    BusError(String),

    /// Serial adapter I/O failure
    #[error("Serial port error: {0}")]
    Serial(String),

    /// Frame could not be built or parsed
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),
}

impl TransportError {
    /// A timeout is the normal outcome of a quiet bus, not a fault
    pub fn is_timeout(&self) -> bool {
        matches!(self, TransportError::Timeout(_))
    }
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Serial(err.to_string())
    }
}

impl From<tokio_serial::Error> for TransportError {
    fn from(err: tokio_serial::Error) -> Self {
        TransportError::Serial(err.to_string())
    }
}
