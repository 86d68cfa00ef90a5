//! ECU State Record

use frame_decoder::{Channel, ChannelSample};
use serde::{Deserialize, Serialize};

/// Transmission health derived from the status flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TcuStatus {
    Ok,
    Warning,
    Error,
}

impl TcuStatus {
    /// Numeric code used by dashboards (0 ok, 1 warning, 2 error)
    pub fn code(&self) -> u8 {
        match self {
            TcuStatus::Ok => 0,
            TcuStatus::Warning => 1,
            TcuStatus::Error => 2,
        }
    }
}

/// Latest known vehicle state
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct EcuState {
    pub engine_rpm: f64,
    pub manifold_kpa: f64,
    pub throttle_pct: f64,
    pub pedal_pct: f64,
    pub wastegate_set_pct: f64,
    pub wastegate_pos_pct: f64,
    pub bov_pct: f64,
    pub engine_torque_target_nm: f64,
    /// Stays at zero while the channel is disabled in the frame layout
    pub engine_torque_actual_nm: f64,
    pub tcu_torque_request_nm: f64,
    pub tcu_torque_actual_nm: f64,
    pub torque_limit_nm: f64,
    pub tcu_protection_active: bool,
    pub tcu_limp_mode: bool,
    /// Milliseconds since the store was created, at the last applied update
    pub timestamp_ms: u64,
    /// Number of updates applied so far
    pub sequence: u64,
    /// Whether the bus is currently delivering frames
    pub connected: bool,
}

impl EcuState {
    /// Limp mode outranks protection
    pub fn tcu_status(&self) -> TcuStatus {
        if self.tcu_limp_mode {
            TcuStatus::Error
        } else if self.tcu_protection_active {
            TcuStatus::Warning
        } else {
            TcuStatus::Ok
        }
    }

    /// Latest value of a channel (flags read as 0.0 / 1.0)
    pub fn value(&self, channel: Channel) -> f64 {
        match channel {
            Channel::EngineSpeed => self.engine_rpm,
            Channel::ManifoldPressure => self.manifold_kpa,
            Channel::ThrottlePosition => self.throttle_pct,
            Channel::PedalPosition => self.pedal_pct,
            Channel::WastegateSetpoint => self.wastegate_set_pct,
            Channel::WastegatePosition => self.wastegate_pos_pct,
            Channel::BlowOffValve => self.bov_pct,
            Channel::EngineTorqueTarget => self.engine_torque_target_nm,
            Channel::EngineTorqueActual => self.engine_torque_actual_nm,
            Channel::TcuTorqueRequest => self.tcu_torque_request_nm,
            Channel::TcuTorqueActual => self.tcu_torque_actual_nm,
            Channel::TorqueLimit => self.torque_limit_nm,
            Channel::TcuProtection => flag_value(self.tcu_protection_active),
            Channel::TcuLimpMode => flag_value(self.tcu_limp_mode),
        }
    }

    /// Write one sample into its field, ignoring validity
    pub(crate) fn apply(&mut self, sample: &ChannelSample) {
        let value = sample.value;
        match sample.channel {
            Channel::EngineSpeed => self.engine_rpm = value,
            Channel::ManifoldPressure => self.manifold_kpa = value,
            Channel::ThrottlePosition => self.throttle_pct = value,
            Channel::PedalPosition => self.pedal_pct = value,
            Channel::WastegateSetpoint => self.wastegate_set_pct = value,
            Channel::WastegatePosition => self.wastegate_pos_pct = value,
            Channel::BlowOffValve => self.bov_pct = value,
            Channel::EngineTorqueTarget => self.engine_torque_target_nm = value,
            Channel::EngineTorqueActual => self.engine_torque_actual_nm = value,
            Channel::TcuTorqueRequest => self.tcu_torque_request_nm = value,
            Channel::TcuTorqueActual => self.tcu_torque_actual_nm = value,
            Channel::TorqueLimit => self.torque_limit_nm = value,
            Channel::TcuProtection => self.tcu_protection_active = sample.as_flag(),
            Channel::TcuLimpMode => self.tcu_limp_mode = sample.as_flag(),
        }
    }
}

fn flag_value(flag: bool) -> f64 {
    if flag {
        1.0
    } else {
        0.0
    }
}
