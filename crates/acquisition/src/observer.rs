//! Raw Frame Observers
//!
//! Observers see every received frame before decoding, known identifier or
//! not. They run on the acquisition worker, so they must return quickly.

use std::fmt;
use tokio::sync::broadcast;
use tracing::debug;

/// Receives every raw frame from the acquisition loop
pub trait RawFrameObserver: Send + Sync {
    fn on_raw_frame(&self, id: u32, payload: &[u8]);
}

/// A raw frame as broadcast to async consumers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFrame {
    pub id: u32,
    pub payload: Vec<u8>,
}

/// Fans raw frames out to any number of async subscribers
///
/// Slow subscribers lag and lose the oldest frames; the loop never waits.
#[derive(Debug, Clone)]
pub struct BroadcastObserver {
    tx: broadcast::Sender<RawFrame>,
}

impl BroadcastObserver {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RawFrame> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl RawFrameObserver for BroadcastObserver {
    fn on_raw_frame(&self, id: u32, payload: &[u8]) {
        let frame = RawFrame {
            id,
            payload: payload.to_vec(),
        };
        // No subscribers is not an error
        if self.tx.send(frame).is_err() {
            debug!("No raw frame subscribers for ID 0x{:03X}", id);
        }
    }
}

/// One frame formatted for a diagnostic terminal
///
/// `seconds.millis | ID | DLC | hex bytes | ASCII`
#[derive(Debug, Clone, Copy)]
pub struct SnifferLine<'a> {
    timestamp_ms: u64,
    id: u32,
    payload: &'a [u8],
}

impl<'a> SnifferLine<'a> {
    pub fn new(timestamp_ms: u64, id: u32, payload: &'a [u8]) -> Self {
        Self {
            timestamp_ms,
            id,
            payload,
        }
    }
}

impl fmt::Display for SnifferLine<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let timestamp = format!("{}.{:03}", self.timestamp_ms / 1000, self.timestamp_ms % 1000);
        let hex: String = self.payload.iter().map(|b| format!("{:02X} ", b)).collect();
        let ascii: String = self
            .payload
            .iter()
            .map(|&b| {
                if (0x20..=0x7E).contains(&b) {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();

        write!(
            f,
            "{:<12} | {:<3X} | {} | {:<24} | {}",
            timestamp,
            self.id,
            self.payload.len(),
            hex,
            ascii
        )
    }
}
