//! Range Validation for Decoded Samples

use crate::channel::Channel;
use crate::error::ValidationError;
use serde::{Deserialize, Serialize};

/// Physical ranges a decoded value must fall within
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationConfig {
    /// Engine speed valid range (rpm)
    pub rpm_range: (f64, f64),
    /// Absolute pressure valid range (kPa)
    pub pressure_range: (f64, f64),
    /// Percentage channels valid range (%)
    pub percent_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            rpm_range: (0.0, 8000.0),
            pressure_range: (0.0, 300.0),
            percent_range: (0.0, 100.0),
        }
    }
}

/// Torque ceiling used until the decoder sets the engine maximum (Nm)
const DEFAULT_TORQUE_MAX_NM: f64 = 500.0;

/// Per-channel plausibility check
///
/// Torque channels are valid from zero up to the engine's maximum torque.
#[derive(Debug, Clone)]
pub struct Validator {
    config: ValidationConfig,
    torque_max_nm: f64,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self {
            config,
            torque_max_nm: DEFAULT_TORQUE_MAX_NM,
        }
    }

    /// Valid range for a channel
    pub fn range(&self, channel: Channel) -> (f64, f64) {
        match channel {
            Channel::EngineSpeed => self.config.rpm_range,
            Channel::ManifoldPressure => self.config.pressure_range,
            Channel::ThrottlePosition
            | Channel::PedalPosition
            | Channel::WastegateSetpoint
            | Channel::WastegatePosition
            | Channel::BlowOffValve => self.config.percent_range,
            Channel::EngineTorqueTarget
            | Channel::EngineTorqueActual
            | Channel::TcuTorqueRequest
            | Channel::TcuTorqueActual
            | Channel::TorqueLimit => (0.0, self.torque_max_nm),
            Channel::TcuProtection | Channel::TcuLimpMode => (0.0, 1.0),
        }
    }

    /// Validate a single value against a range
    pub fn validate_range(
        &self,
        field: &'static str,
        value: f64,
        range: (f64, f64),
    ) -> Result<(), ValidationError> {
        // NaN fails the contains check as well
        if (range.0..=range.1).contains(&value) {
            Ok(())
        } else {
            Err(ValidationError::OutOfRange {
                field,
                value,
                min: range.0,
                max: range.1,
            })
        }
    }

    /// Validate a decoded value for its channel
    pub fn validate(&self, channel: Channel, value: f64) -> Result<(), ValidationError> {
        self.validate_range(channel.name(), value, self.range(channel))
    }

    /// Validate engine speed
    pub fn validate_rpm(&self, rpm: f64) -> Result<(), ValidationError> {
        self.validate(Channel::EngineSpeed, rpm)
    }

    /// Validate manifold pressure
    pub fn validate_pressure(&self, kpa: f64) -> Result<(), ValidationError> {
        self.validate(Channel::ManifoldPressure, kpa)
    }

    /// Rescale the torque range to a new engine maximum
    pub(crate) fn set_torque_max(&mut self, max_nm: f64) {
        self.torque_max_nm = max_nm;
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_rpm() {
        let validator = Validator::default();
        assert!(validator.validate_rpm(3000.0).is_ok());
        assert!(validator.validate_rpm(0.0).is_ok());
        assert!(validator.validate_rpm(8000.0).is_ok());
    }

    #[test]
    fn test_invalid_rpm() {
        let validator = Validator::default();
        assert!(validator.validate_rpm(-50.0).is_err());
        assert!(validator.validate_rpm(9000.0).is_err());
        assert!(validator.validate_rpm(f64::NAN).is_err());
    }

    #[test]
    fn test_pressure_range() {
        let validator = Validator::default();
        assert!(validator.validate_pressure(100.0).is_ok());
        assert!(validator.validate_pressure(300.0).is_ok());
        assert!(validator.validate_pressure(300.1).is_err());
    }

    #[test]
    fn test_percent_channels() {
        let validator = Validator::default();
        assert!(validator.validate(Channel::ThrottlePosition, 100.0).is_ok());
        assert!(validator.validate(Channel::ThrottlePosition, 100.4).is_err());
        assert!(validator.validate(Channel::BlowOffValve, -0.1).is_err());
    }

    #[test]
    fn test_torque_range_follows_engine_maximum() {
        let mut validator = Validator::default();
        assert_eq!(validator.range(Channel::TorqueLimit), (0.0, 500.0));
        validator.set_torque_max(350.0);
        assert_eq!(validator.range(Channel::TcuTorqueActual), (0.0, 350.0));
        assert!(validator.validate(Channel::TcuTorqueActual, 351.0).is_err());
    }

    #[test]
    fn test_out_of_range_message() {
        let validator = Validator::default();
        let err = validator.validate_rpm(9000.0).unwrap_err();
        assert_eq!(
            err.to_string(),
            "engine_rpm value 9000 is out of range [0, 8000]"
        );
    }
}
