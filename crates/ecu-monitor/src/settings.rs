//! Monitor Settings
//!
//! Loaded from an optional TOML file, then overridden by `ECU_` environment
//! variables (`ECU_LOG_LEVEL=debug`, `ECU_ACQUISITION__ERROR_THRESHOLD=3`).

use acquisition::AcquisitionConfig;
use can_protocol::SLCAN_BAUD_RATE;
use config::{Config, Environment, File};
use frame_decoder::{DecoderConfig, ValidationConfig};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::Level;

/// Settings file used when none is given on the command line
pub const DEFAULT_SETTINGS_PATH: &str = "ecu-monitor.toml";

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("Failed to load settings: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid log level: {0}")]
    InvalidLogLevel(String),
}

/// Which bus adapter to use
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TransportSettings {
    /// Synthesized engine traffic, no hardware needed
    Mock,
    /// SLCAN serial adapter
    Slcan {
        device: String,
        #[serde(default = "default_baud_rate")]
        baud_rate: u32,
    },
}

fn default_baud_rate() -> u32 {
    SLCAN_BAUD_RATE
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings::Mock
    }
}

/// Raw frame trace file
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    /// Whether a trace file is created at all
    pub available: bool,
    /// Whether tracing starts switched on
    pub enabled: bool,
    pub path: PathBuf,
    pub queue_capacity: usize,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            available: true,
            enabled: false,
            path: PathBuf::from("logs/can_trace.csv"),
            queue_capacity: trace_log::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Top-level monitor settings
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub log_level: String,
    /// Interval between snapshot reports (ms)
    pub report_interval_ms: u64,
    pub event_log_capacity: usize,
    pub transport: TransportSettings,
    pub acquisition: AcquisitionConfig,
    pub decoder: DecoderConfig,
    pub validation: ValidationConfig,
    pub trace: TraceSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            report_interval_ms: 1000,
            event_log_capacity: event_log::DEFAULT_CAPACITY,
            transport: TransportSettings::default(),
            acquisition: AcquisitionConfig::default(),
            decoder: DecoderConfig::default(),
            validation: ValidationConfig::default(),
            trace: TraceSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings; a missing file means defaults
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SettingsError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()).required(false))
            .add_source(
                Environment::with_prefix("ECU")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(settings)
    }

    /// Parsed maximum log level
    pub fn log_level(&self) -> Result<Level, SettingsError> {
        Level::from_str(&self.log_level)
            .map_err(|_| SettingsError::InvalidLogLevel(self.log_level.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = Settings::load(dir.path().join("absent.toml")).unwrap();

        assert_eq!(settings.transport, TransportSettings::Mock);
        assert_eq!(settings.acquisition, AcquisitionConfig::default());
        assert_eq!(settings.decoder.max_torque_nm, 500.0);
        assert_eq!(settings.log_level().unwrap(), Level::INFO);
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("monitor.toml");
        std::fs::write(
            &path,
            r#"
log_level = "debug"
report_interval_ms = 250

[transport]
kind = "slcan"
device = "/dev/ttyACM0"

[acquisition]
bitrate = "250k"
error_threshold = 3

[decoder]
max_torque_nm = 420.0

[trace]
enabled = true
path = "/tmp/trace.csv"
"#,
        )
        .unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.log_level().unwrap(), Level::DEBUG);
        assert_eq!(settings.report_interval_ms, 250);
        assert_eq!(
            settings.transport,
            TransportSettings::Slcan {
                device: "/dev/ttyACM0".to_string(),
                baud_rate: SLCAN_BAUD_RATE,
            }
        );
        assert_eq!(settings.acquisition.bitrate, can_protocol::Bitrate::K250);
        assert_eq!(settings.acquisition.error_threshold, 3);
        assert_eq!(settings.acquisition.receive_timeout_ms, 100);
        assert_eq!(settings.decoder.max_torque_nm, 420.0);
        assert!(settings.trace.enabled);
        assert!(settings.trace.available);
    }

    #[test]
    fn test_invalid_log_level() {
        let settings = Settings {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            settings.log_level(),
            Err(SettingsError::InvalidLogLevel(_))
        ));
    }
}
