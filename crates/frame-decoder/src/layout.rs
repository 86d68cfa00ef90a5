//! Frame Layout Table
//!
//! One entry per monitored identifier. Each signal names the bytes it reads,
//! how the raw field becomes a physical value, and whether it is decoded at
//! all. Multi-byte fields are big-endian.

use crate::channel::Channel;
use crate::ids;
use std::ops::Range;

/// Where a raw field lives in the payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    /// Single unsigned byte
    U8 { byte: usize },
    /// Big-endian unsigned 16-bit value starting at `byte`
    U16Be { byte: usize },
    /// One or more bits of a byte, non-zero means set
    Bits { byte: usize, mask: u8 },
}

impl Field {
    /// Payload byte range the field occupies
    pub fn bytes(&self) -> Range<usize> {
        match *self {
            Field::U8 { byte } | Field::Bits { byte, .. } => byte..byte + 1,
            Field::U16Be { byte } => byte..byte + 2,
        }
    }

    /// Read the raw field, or `None` if the payload is too short
    pub fn extract(&self, payload: &[u8]) -> Option<f64> {
        match *self {
            Field::U8 { byte } => payload.get(byte).map(|&b| b as f64),
            Field::U16Be { byte } => {
                let hi = *payload.get(byte)?;
                let lo = *payload.get(byte + 1)?;
                Some(u16::from_be_bytes([hi, lo]) as f64)
            }
            Field::Bits { byte, mask } => payload
                .get(byte)
                .map(|&b| if b & mask != 0 { 1.0 } else { 0.0 }),
        }
    }
}

/// Raw-to-physical conversion
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Conversion {
    /// `raw * scale + offset`
    Linear { scale: f64, offset: f64 },
    /// `raw * scale` is a percentage of the engine's maximum torque
    TorquePercent { scale: f64 },
    /// Raw field is already 0.0 / 1.0
    Flag,
}

impl Conversion {
    /// Apply the conversion
    pub fn apply(&self, raw: f64, max_torque_nm: f64) -> f64 {
        match *self {
            Conversion::Linear { scale, offset } => raw * scale + offset,
            Conversion::TorquePercent { scale } => raw * scale / 100.0 * max_torque_nm,
            Conversion::Flag => raw,
        }
    }
}

/// One signal within a frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SignalLayout {
    pub channel: Channel,
    pub field: Field,
    pub conversion: Conversion,
    /// Disabled signals stay in the table for documentation but never decode
    pub enabled: bool,
}

impl SignalLayout {
    const fn linear(channel: Channel, field: Field, scale: f64, offset: f64) -> Self {
        Self {
            channel,
            field,
            conversion: Conversion::Linear { scale, offset },
            enabled: true,
        }
    }

    const fn torque(channel: Channel, field: Field, scale: f64) -> Self {
        Self {
            channel,
            field,
            conversion: Conversion::TorquePercent { scale },
            enabled: true,
        }
    }

    const fn flag(channel: Channel, byte: usize, mask: u8) -> Self {
        Self {
            channel,
            field: Field::Bits { byte, mask },
            conversion: Conversion::Flag,
            enabled: true,
        }
    }

    const fn disabled(self) -> Self {
        Self {
            enabled: false,
            ..self
        }
    }
}

/// Decode descriptor for one identifier
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameLayout {
    pub id: u32,
    pub name: &'static str,
    pub signals: &'static [SignalLayout],
}

impl FrameLayout {
    /// Signals that are actually decoded
    pub fn enabled_signals(&self) -> impl Iterator<Item = &SignalLayout> {
        self.signals.iter().filter(|s| s.enabled)
    }
}

/// The fixed decode table
pub static FRAME_LAYOUTS: &[FrameLayout] = &[
    FrameLayout {
        id: ids::ENGINE_1,
        name: "engine_1",
        signals: &[
            SignalLayout::linear(Channel::EngineSpeed, Field::U16Be { byte: 2 }, 0.25, 0.0),
            SignalLayout::linear(Channel::PedalPosition, Field::U8 { byte: 4 }, 0.4, 0.0),
            SignalLayout::torque(Channel::EngineTorqueTarget, Field::U8 { byte: 5 }, 0.3937),
            SignalLayout::linear(Channel::ThrottlePosition, Field::U8 { byte: 7 }, 0.3937, 0.0),
            // Bus documentation places actual torque on byte 3, which is the
            // low byte of engine speed. Disabled until the mapping is confirmed.
            SignalLayout::torque(Channel::EngineTorqueActual, Field::U8 { byte: 3 }, 0.3937)
                .disabled(),
        ],
    },
    FrameLayout {
        id: ids::MANIFOLD,
        name: "manifold",
        signals: &[SignalLayout::linear(
            Channel::ManifoldPressure,
            Field::U16Be { byte: 2 },
            0.01,
            0.0,
        )],
    },
    FrameLayout {
        id: ids::WASTEGATE,
        name: "wastegate",
        signals: &[
            SignalLayout::linear(Channel::WastegateSetpoint, Field::U8 { byte: 1 }, 0.5, 0.0),
            SignalLayout::linear(Channel::WastegatePosition, Field::U8 { byte: 2 }, 0.5, 0.0),
        ],
    },
    FrameLayout {
        id: ids::BLOW_OFF_VALVE,
        name: "blow_off_valve",
        signals: &[SignalLayout::linear(
            Channel::BlowOffValve,
            Field::U8 { byte: 0 },
            50.0 / 255.0,
            0.0,
        )],
    },
    FrameLayout {
        id: ids::TCU_TORQUE,
        name: "tcu_torque",
        signals: &[
            SignalLayout::torque(Channel::TcuTorqueRequest, Field::U8 { byte: 1 }, 0.39),
            SignalLayout::torque(Channel::TcuTorqueActual, Field::U8 { byte: 2 }, 0.39),
        ],
    },
    FrameLayout {
        id: ids::ENGINE_LIMITS,
        name: "engine_limits",
        signals: &[SignalLayout::torque(
            Channel::TorqueLimit,
            Field::U8 { byte: 5 },
            0.4,
        )],
    },
    FrameLayout {
        id: ids::TCU_STATUS,
        name: "tcu_status",
        signals: &[
            SignalLayout::flag(Channel::TcuProtection, 0, 0x01),
            SignalLayout::flag(Channel::TcuLimpMode, 0, 0x02),
        ],
    },
];

/// Look up the layout for an identifier
pub fn layout_for(id: u32) -> Option<&'static FrameLayout> {
    FRAME_LAYOUTS.iter().find(|layout| layout.id == id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifiers_are_unique() {
        let mut ids: Vec<u32> = FRAME_LAYOUTS.iter().map(|l| l.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), FRAME_LAYOUTS.len());
    }

    #[test]
    fn test_enabled_signals_never_share_a_byte() {
        for layout in FRAME_LAYOUTS {
            let mut used = [false; 8];
            for signal in layout.enabled_signals() {
                // Bit fields may share their byte with other bit fields
                if matches!(signal.field, Field::Bits { .. }) {
                    continue;
                }
                for byte in signal.field.bytes() {
                    assert!(
                        !used[byte],
                        "{}: byte {} decoded twice ({})",
                        layout.name, byte, signal.channel
                    );
                    used[byte] = true;
                }
            }
        }
    }

    #[test]
    fn test_flag_bits_do_not_overlap() {
        for layout in FRAME_LAYOUTS {
            let mut masks = [0u8; 8];
            for signal in layout.enabled_signals() {
                if let Field::Bits { byte, mask } = signal.field {
                    assert_eq!(masks[byte] & mask, 0, "{}: overlapping flag bits", layout.name);
                    masks[byte] |= mask;
                }
            }
        }
    }

    #[test]
    fn test_engine_torque_actual_is_disabled() {
        let layout = layout_for(ids::ENGINE_1).unwrap();
        assert!(layout
            .enabled_signals()
            .all(|s| s.channel != Channel::EngineTorqueActual));
        assert!(layout
            .signals
            .iter()
            .any(|s| s.channel == Channel::EngineTorqueActual && !s.enabled));
    }

    #[test]
    fn test_extract_respects_payload_length() {
        assert_eq!(Field::U16Be { byte: 2 }.extract(&[0, 0, 0x1E]), None);
        assert_eq!(Field::U16Be { byte: 2 }.extract(&[0, 0, 0x1E, 0x00]), Some(7680.0));
        assert_eq!(Field::U8 { byte: 7 }.extract(&[0; 7]), None);
        assert_eq!(Field::Bits { byte: 0, mask: 0x02 }.extract(&[0x03]), Some(1.0));
        assert_eq!(Field::Bits { byte: 0, mask: 0x02 }.extract(&[0x01]), Some(0.0));
    }

    #[test]
    fn test_torque_conversion() {
        let conversion = Conversion::TorquePercent { scale: 0.4 };
        // 125 * 0.4 = 50% of 500 Nm
        assert!((conversion.apply(125.0, 500.0) - 250.0).abs() < 1e-9);
    }
}
