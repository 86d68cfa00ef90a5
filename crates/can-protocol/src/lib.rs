//! CAN Bus Protocol Layer
//!
//! This crate provides the raw frame type received from the vehicle bus and
//! the transport abstraction the acquisition engine drives. Two transports
//! ship with it: a mock (scripted or simulated traffic) and an SLCAN
//! serial-line adapter.

mod bitrate;
mod error;
mod frame;
mod mock;
mod slcan;
mod transport;

pub use bitrate::Bitrate;
pub use error::TransportError;
pub use frame::CanFrame;
pub use mock::{MockEvent, MockHandle, MockTransport};
pub use slcan::{parse_slcan_line, SlcanTransport, SLCAN_BAUD_RATE};
pub use transport::CanTransport;

/// Identifier limits
pub mod id {
    /// Highest 11-bit (standard) identifier
    pub const MAX_STANDARD: u32 = 0x7FF;
    /// Highest 29-bit (extended) identifier
    pub const MAX_EXTENDED: u32 = 0x1FFF_FFFF;
}

/// Maximum payload of a classic CAN frame
pub const MAX_PAYLOAD: usize = 8;
