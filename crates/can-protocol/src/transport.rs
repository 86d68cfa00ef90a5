//! CAN Transport Abstraction
//!
//! The acquisition worker is the sole owner of a transport; nothing else may
//! receive from it concurrently.

use crate::bitrate::Bitrate;
use crate::error::TransportError;
use crate::frame::CanFrame;
use std::future::Future;
use std::time::Duration;

/// A bus controller the acquisition engine can drive
pub trait CanTransport: Send {
    /// Install the driver with the given bitrate (once, at boot)
    fn install(
        &mut self,
        bitrate: Bitrate,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Start the controller; a no-op when already running
    fn start(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Stop the controller; a no-op when not running
    fn stop(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Wait at most `timeout` for the next frame
    ///
    /// A quiet bus yields [`TransportError::Timeout`]; every other error is a
    /// controller or adapter fault.
    fn receive(
        &mut self,
        timeout: Duration,
    ) -> impl Future<Output = Result<CanFrame, TransportError>> + Send;

    /// Whether the controller is currently started
    fn is_running(&self) -> bool;
}
