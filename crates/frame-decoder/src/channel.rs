//! Channel Definitions

use serde::{Deserialize, Serialize};
use std::fmt;

/// Physical quantities tracked from the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Channel {
    /// Engine speed (rpm)
    EngineSpeed,
    /// Manifold absolute pressure (kPa)
    ManifoldPressure,
    /// Throttle plate position (%)
    ThrottlePosition,
    /// Accelerator pedal position (%)
    PedalPosition,
    /// Wastegate setpoint (%)
    WastegateSetpoint,
    /// Wastegate measured position (%)
    WastegatePosition,
    /// Blow-off valve duty (%)
    BlowOffValve,
    /// Engine torque target (Nm)
    EngineTorqueTarget,
    /// Engine actual torque (Nm)
    EngineTorqueActual,
    /// Transmission torque request (Nm)
    TcuTorqueRequest,
    /// Transmission actual torque (Nm)
    TcuTorqueActual,
    /// Engine torque limit (Nm)
    TorqueLimit,
    /// Transmission protection active (flag)
    TcuProtection,
    /// Transmission limp mode active (flag)
    TcuLimpMode,
}

impl Channel {
    /// Every channel, in display order
    pub const ALL: [Channel; 14] = [
        Channel::EngineSpeed,
        Channel::ManifoldPressure,
        Channel::ThrottlePosition,
        Channel::PedalPosition,
        Channel::WastegateSetpoint,
        Channel::WastegatePosition,
        Channel::BlowOffValve,
        Channel::EngineTorqueTarget,
        Channel::EngineTorqueActual,
        Channel::TcuTorqueRequest,
        Channel::TcuTorqueActual,
        Channel::TorqueLimit,
        Channel::TcuProtection,
        Channel::TcuLimpMode,
    ];

    /// Short snake_case name used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Channel::EngineSpeed => "engine_rpm",
            Channel::ManifoldPressure => "manifold_pressure",
            Channel::ThrottlePosition => "throttle_position",
            Channel::PedalPosition => "pedal_position",
            Channel::WastegateSetpoint => "wastegate_setpoint",
            Channel::WastegatePosition => "wastegate_position",
            Channel::BlowOffValve => "blow_off_valve",
            Channel::EngineTorqueTarget => "engine_torque_target",
            Channel::EngineTorqueActual => "engine_torque_actual",
            Channel::TcuTorqueRequest => "tcu_torque_request",
            Channel::TcuTorqueActual => "tcu_torque_actual",
            Channel::TorqueLimit => "torque_limit",
            Channel::TcuProtection => "tcu_protection",
            Channel::TcuLimpMode => "tcu_limp_mode",
        }
    }

    /// Physical unit of decoded values
    pub fn unit(&self) -> &'static str {
        match self {
            Channel::EngineSpeed => "rpm",
            Channel::ManifoldPressure => "kPa",
            Channel::ThrottlePosition
            | Channel::PedalPosition
            | Channel::WastegateSetpoint
            | Channel::WastegatePosition
            | Channel::BlowOffValve => "%",
            Channel::EngineTorqueTarget
            | Channel::EngineTorqueActual
            | Channel::TcuTorqueRequest
            | Channel::TcuTorqueActual
            | Channel::TorqueLimit => "Nm",
            Channel::TcuProtection | Channel::TcuLimpMode => "",
        }
    }

    /// Whether the channel is a boolean status bit
    pub fn is_flag(&self) -> bool {
        matches!(self, Channel::TcuProtection | Channel::TcuLimpMode)
    }

    /// Whether the channel is a torque value scaled by the engine's maximum
    pub fn is_torque(&self) -> bool {
        self.unit() == "Nm"
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One decoded, range-checked value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChannelSample {
    /// Which quantity this is
    pub channel: Channel,
    /// Physical value in the channel's unit (flags are 0.0 or 1.0)
    pub value: f64,
    /// Whether the value passed its range check
    pub valid: bool,
}

impl ChannelSample {
    /// Flag channels read as booleans
    pub fn as_flag(&self) -> bool {
        self.value != 0.0
    }
}
