//! ECU Monitor
//!
//! Wires the acquisition engine to a transport, a trace file and the event
//! log, and reports the live vehicle state.

mod monitor;
mod settings;

pub use monitor::{format_snapshot, Monitor, TerminalObserver};
pub use settings::{
    Settings, SettingsError, TraceSettings, TransportSettings, DEFAULT_SETTINGS_PATH,
};

use tracing::subscriber::SetGlobalDefaultError;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// Initialize logging
pub fn init_logging(level: Level) -> Result<(), SetGlobalDefaultError> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
}
