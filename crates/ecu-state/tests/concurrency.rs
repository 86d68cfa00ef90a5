//! Concurrent update/snapshot behaviour of the state store

use ecu_state::EcuStateStore;
use frame_decoder::{Channel, ChannelSample, FrameDecoder};
use proptest::prelude::*;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

/// Every update writes three fields derived from the same step number
fn samples_for(step: u64) -> [ChannelSample; 3] {
    let k = (step % 100) as f64;
    [
        ChannelSample {
            channel: Channel::EngineSpeed,
            value: k * 10.0,
            valid: true,
        },
        ChannelSample {
            channel: Channel::ThrottlePosition,
            value: k,
            valid: true,
        },
        ChannelSample {
            channel: Channel::PedalPosition,
            value: k,
            valid: true,
        },
    ]
}

#[test]
fn test_snapshots_are_never_torn() {
    let store = Arc::new(EcuStateStore::new());
    let done = Arc::new(AtomicBool::new(false));
    const UPDATES: u64 = 20_000;

    let writer = {
        let store = store.clone();
        let done = done.clone();
        thread::spawn(move || {
            for step in 0..UPDATES {
                store.update(&samples_for(step));
            }
            done.store(true, Ordering::Release);
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            let done = done.clone();
            thread::spawn(move || {
                let mut last_sequence = 0;
                let mut last_timestamp = 0;
                while !done.load(Ordering::Acquire) {
                    let state = store.snapshot();
                    assert_eq!(state.engine_rpm, state.throttle_pct * 10.0);
                    assert_eq!(state.throttle_pct, state.pedal_pct);
                    assert!(state.sequence >= last_sequence);
                    assert!(state.timestamp_ms >= last_timestamp);
                    last_sequence = state.sequence;
                    last_timestamp = state.timestamp_ms;
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    let state = store.snapshot();
    assert_eq!(state.sequence, UPDATES);
    let last = samples_for(UPDATES - 1);
    assert_eq!(state.engine_rpm, last[0].value);
}

proptest! {
    #[test]
    fn test_out_of_range_values_never_reach_the_store(
        id in prop_oneof![Just(0x280u32), Just(0x580), Just(0x390), Just(0x394), Just(0x488), Just(0x288)],
        data in proptest::collection::vec(any::<u8>(), 8),
    ) {
        let decoder = FrameDecoder::default();
        let store = EcuStateStore::new();
        let frame = can_protocol::CanFrame::new(id, &data).unwrap();
        store.update(&decoder.decode(&frame));

        let state = store.snapshot();
        for channel in Channel::ALL {
            let (min, max) = decoder.validator().range(channel);
            let value = state.value(channel);
            // Untouched fields stay at zero, which is inside every range
            prop_assert!(value >= min && value <= max, "{} = {}", channel, value);
        }
    }
}
