//! Service lifecycle with simulated traffic, a trace file and a broadcast observer

use acquisition::{AcquisitionConfig, AcquisitionLoop, AcquisitionService, BroadcastObserver};
use can_protocol::MockTransport;
use ecu_state::EcuStateStore;
use event_log::EventLog;
use frame_decoder::FrameDecoder;
use std::sync::Arc;
use std::time::Duration;
use trace_log::FileTraceSink;

#[tokio::test]
async fn test_simulated_bus_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let trace_path = dir.path().join("traces").join("can.csv");
    let (trace, writer) = FileTraceSink::spawn(&trace_path, 4096, true);
    let broadcast = Arc::new(BroadcastObserver::new(256));
    let mut frames = broadcast.subscribe();

    let store = Arc::new(EcuStateStore::new());
    let acq = AcquisitionLoop::new(
        MockTransport::simulated(),
        FrameDecoder::default(),
        store.clone(),
        Arc::new(EventLog::with_default_capacity()),
        AcquisitionConfig::default(),
    )
    .with_trace_sink(Arc::new(trace))
    .with_observer(broadcast.clone());

    let mut service = AcquisitionService::new(acq);
    let status = service.status();
    service.init().await.unwrap();
    service.start().await.unwrap();

    let first = tokio::time::timeout(Duration::from_secs(2), frames.recv())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(first.id, 0x280);

    tokio::time::sleep(Duration::from_millis(400)).await;
    let live = store.snapshot();
    assert!(live.connected);
    assert!(live.engine_rpm > 0.0);
    assert!(live.sequence > 0);

    service.stop().await.unwrap();
    assert!(!store.snapshot().connected);
    let received = status.frames_received();
    assert!(received >= 2);

    // Dropping the service releases the last handle on the trace sink
    drop(service);
    let lines_written = writer.await.unwrap().unwrap();
    assert_eq!(lines_written, received);

    let content = std::fs::read_to_string(&trace_path).unwrap();
    assert_eq!(content.lines().count() as u64, received);
    assert!(content.lines().next().unwrap().contains(",280,8,"));
}
