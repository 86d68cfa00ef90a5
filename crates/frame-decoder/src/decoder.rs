//! Frame Decoder

use crate::channel::ChannelSample;
use crate::error::ValidationError;
use crate::layout::{layout_for, FrameLayout};
use crate::validator::{ValidationConfig, Validator};
use can_protocol::CanFrame;
use serde::{Deserialize, Serialize};

/// Decoder settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Maximum engine torque used to convert torque percentages (Nm)
    pub max_torque_nm: f64,
}

impl Default for DecoderConfig {
    fn default() -> Self {
        Self {
            max_torque_nm: 500.0,
        }
    }
}

/// Decodes frames into validated channel samples
///
/// `decode` takes `&self` and touches nothing but the frame, so one decoder
/// can be shared freely and the same frame always yields the same samples.
#[derive(Debug, Clone)]
pub struct FrameDecoder {
    max_torque_nm: f64,
    validator: Validator,
}

impl FrameDecoder {
    /// Create a decoder; a non-positive maximum torque is rejected
    pub fn new(
        config: DecoderConfig,
        validation: ValidationConfig,
    ) -> Result<Self, ValidationError> {
        let mut decoder = Self {
            max_torque_nm: DecoderConfig::default().max_torque_nm,
            validator: Validator::new(validation),
        };
        decoder.set_max_torque(config.max_torque_nm)?;
        Ok(decoder)
    }

    /// Set the maximum engine torque; non-positive values are rejected
    pub fn set_max_torque(&mut self, max_torque_nm: f64) -> Result<(), ValidationError> {
        if !(max_torque_nm > 0.0 && max_torque_nm.is_finite()) {
            return Err(ValidationError::InvalidConfig(format!(
                "maximum torque must be positive, got {}",
                max_torque_nm
            )));
        }
        self.max_torque_nm = max_torque_nm;
        self.validator.set_torque_max(max_torque_nm);
        Ok(())
    }

    /// Current maximum engine torque (Nm)
    pub fn max_torque_nm(&self) -> f64 {
        self.max_torque_nm
    }

    /// The range validator in use
    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Whether frames with this identifier are decoded
    pub fn is_known(&self, id: u32) -> bool {
        layout_for(id).is_some()
    }

    /// Decode one frame
    ///
    /// Unknown identifiers, extended-format frames and remote requests yield
    /// no samples. Fields the payload is too short for are skipped.
    pub fn decode(&self, frame: &CanFrame) -> Vec<ChannelSample> {
        if frame.is_remote() || frame.is_extended() {
            return Vec::new();
        }

        match layout_for(frame.id()) {
            Some(layout) => self.decode_layout(layout, frame.payload()),
            None => Vec::new(),
        }
    }

    fn decode_layout(&self, layout: &FrameLayout, payload: &[u8]) -> Vec<ChannelSample> {
        layout
            .enabled_signals()
            .filter_map(|signal| {
                let raw = signal.field.extract(payload)?;
                let value = signal.conversion.apply(raw, self.max_torque_nm);
                Some(ChannelSample {
                    channel: signal.channel,
                    value,
                    valid: self.validator.validate(signal.channel, value).is_ok(),
                })
            })
            .collect()
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        let config = DecoderConfig::default();
        let mut validator = Validator::default();
        validator.set_torque_max(config.max_torque_nm);
        Self {
            max_torque_nm: config.max_torque_nm,
            validator,
        }
    }
}
