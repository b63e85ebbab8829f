//! Universal ISO-TP properties (spec §8, properties 1-3), exercised across
//! the public API rather than `src/isotp`'s own unit tests.

use std::time::Instant;

use uds_diag_core::isotp::{DecoderConfig, DecoderEvent, EncoderConfig, IsoTpDecoder, IsoTpEncoder};
use uds_diag_core::testing::FakeTransport;
use uds_diag_core::ModuleAddress;

fn module() -> ModuleAddress {
    ModuleAddress::standard(0x7E0, 0x7E8)
}

fn round_trip(payload: &[u8]) -> Vec<u8> {
    let encoder = IsoTpEncoder::new(EncoderConfig::default());
    let frames = encoder.segment(payload);

    let mut decoder = IsoTpDecoder::new(DecoderConfig::default());
    let mut transport = FakeTransport::new();
    let now = Instant::now();

    let mut result = None;
    for frame in frames {
        match decoder.feed(&mut transport, &module(), &frame, now).unwrap() {
            DecoderEvent::Complete(payload) => {
                result = Some(payload);
                break;
            }
            DecoderEvent::Pending => continue,
        }
    }
    result.expect("decoder never completed reassembly")
}

#[test]
fn round_trip_preserves_payload_at_representative_lengths() {
    for len in [1usize, 6, 7, 8, 9, 100, 4095] {
        let payload: Vec<u8> = (0..len).map(|i| (i % 256) as u8).collect();
        assert_eq!(round_trip(&payload), payload, "length {}", len);
    }
}

#[test]
fn every_encoded_frame_is_at_most_8_bytes() {
    let encoder = IsoTpEncoder::new(EncoderConfig::default());
    for len in [1usize, 7, 8, 4095] {
        let payload = vec![0x11u8; len];
        for frame in encoder.segment(&payload) {
            assert!(frame.len() <= 8);
        }
    }
}

#[test]
fn consecutive_sequence_numbers_are_monotonic_mod_16() {
    let encoder = IsoTpEncoder::new(EncoderConfig::default());
    let payload = vec![0xABu8; 300];
    let frames = encoder.segment(&payload);
    let mut expected = 1u8;
    for frame in &frames[1..] {
        assert_eq!(frame[0] & 0x0F, expected);
        expected = (expected + 1) % 16;
    }
}
