//! ECU Frame Decoder
//!
//! Turns raw bus frames into physical engine and transmission quantities.
//! Decoding is a pure function of the frame: no I/O, no shared state.

mod channel;
mod decoder;
mod error;
mod layout;
mod validator;

pub use channel::{Channel, ChannelSample};
pub use decoder::{DecoderConfig, FrameDecoder};
pub use error::ValidationError;
pub use layout::{layout_for, Conversion, Field, FrameLayout, SignalLayout, FRAME_LAYOUTS};
pub use validator::{ValidationConfig, Validator};

/// Monitored frame identifiers
pub mod ids {
    /// Engine speed, pedal, throttle and engine torque target
    pub const ENGINE_1: u32 = 0x280;
    /// Engine torque limit
    pub const ENGINE_LIMITS: u32 = 0x288;
    /// Wastegate setpoint and position
    pub const WASTEGATE: u32 = 0x390;
    /// Blow-off valve duty
    pub const BLOW_OFF_VALVE: u32 = 0x394;
    /// Transmission torque request and actual torque
    pub const TCU_TORQUE: u32 = 0x488;
    /// Manifold absolute pressure
    pub const MANIFOLD: u32 = 0x580;
    /// Transmission protection and limp-mode flags
    pub const TCU_STATUS: u32 = 0x206;
}
