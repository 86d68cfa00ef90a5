//! ECU Monitor - Main Entry Point

use can_protocol::{MockTransport, SlcanTransport};
use ecu_monitor::{init_logging, Monitor, Settings, TransportSettings, DEFAULT_SETTINGS_PATH};
use tracing::info;

async fn run<T: can_protocol::CanTransport + 'static>(
    transport: T,
    settings: &Settings,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut monitor = Monitor::build(transport, settings)?;
    monitor.start().await;

    let mut report = tokio::time::interval(monitor.report_interval());
    loop {
        tokio::select! {
            _ = report.tick() => {
                info!("{}", monitor.report());
            }
            result = tokio::signal::ctrl_c() => {
                result?;
                info!("Shutting down...");
                break;
            }
        }
    }

    monitor.shutdown().await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_SETTINGS_PATH.to_string());
    let settings = Settings::load(&path)?;
    init_logging(settings.log_level()?)?;

    info!("=== ECU Monitor v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Settings loaded from {}", path);

    match &settings.transport {
        TransportSettings::Mock => {
            info!("Using simulated CAN traffic");
            run(MockTransport::simulated(), &settings).await
        }
        TransportSettings::Slcan { device, baud_rate } => {
            info!("Using SLCAN adapter on {} at {} baud", device, baud_rate);
            run(SlcanTransport::new(device, *baud_rate), &settings).await
        }
    }
}
