//! CAN Bitrate Definitions

use serde::{Deserialize, Serialize};

/// Nominal CAN bitrates supported by the transports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Bitrate {
    /// 10 kbit/s
    #[serde(rename = "10k")]
    K10,
    /// 20 kbit/s
    #[serde(rename = "20k")]
    K20,
    /// 50 kbit/s
    #[serde(rename = "50k")]
    K50,
    /// 100 kbit/s
    #[serde(rename = "100k")]
    K100,
    /// 125 kbit/s
    #[serde(rename = "125k")]
    K125,
    /// 250 kbit/s
    #[serde(rename = "250k")]
    K250,
    /// 500 kbit/s (powertrain bus)
    #[default]
    #[serde(rename = "500k")]
    K500,
    /// 800 kbit/s
    #[serde(rename = "800k")]
    K800,
    /// 1 Mbit/s
    #[serde(rename = "1m")]
    M1,
}

impl Bitrate {
    /// Get the SLCAN setup command for this bitrate
    pub fn slcan_command(&self) -> &'static str {
        match self {
            Bitrate::K10 => "S0",
            Bitrate::K20 => "S1",
            Bitrate::K50 => "S2",
            Bitrate::K100 => "S3",
            Bitrate::K125 => "S4",
            Bitrate::K250 => "S5",
            Bitrate::K500 => "S6",
            Bitrate::K800 => "S7",
            Bitrate::M1 => "S8",
        }
    }

    /// Bits per second
    pub fn bits_per_second(&self) -> u32 {
        match self {
            Bitrate::K10 => 10_000,
            Bitrate::K20 => 20_000,
            Bitrate::K50 => 50_000,
            Bitrate::K100 => 100_000,
            Bitrate::K125 => 125_000,
            Bitrate::K250 => 250_000,
            Bitrate::K500 => 500_000,
            Bitrate::K800 => 800_000,
            Bitrate::M1 => 1_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_powertrain_rate() {
        assert_eq!(Bitrate::default(), Bitrate::K500);
        assert_eq!(Bitrate::default().slcan_command(), "S6");
    }

    #[test]
    fn test_bits_per_second() {
        assert_eq!(Bitrate::K125.bits_per_second(), 125_000);
        assert_eq!(Bitrate::M1.bits_per_second(), 1_000_000);
    }
}
