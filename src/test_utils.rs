//! Test utilities for building Xbus streams
//!
//! Deterministic frame and capture generators shared by unit tests, integration tests
//! and benchmarks, so none of them depend on recorded device data.

#![cfg(any(test, feature = "benchmark"))]

use crate::types::Frame;

pub use crate::protocol::TlvWriter;
pub use crate::protocol::fixed_point::encode as encode_fp1632;

/// Bytes that never contain the frame preamble, for noise between frames.
pub const NOISE: &[u8] = &[0x00, 0x13, 0x37, 0x42, 0xF9, 0xFB, 0x7E];

/// A realistic MTData2 payload for sample `index`.
///
/// The orientation turns 1° per sample about the vertical axis, so consecutive
/// records are distinguishable.
pub fn sample_payload(index: usize) -> Vec<u8> {
    let half_yaw = (index % 360) as f64 * 0.5_f64.to_radians();
    let (s, c) = half_yaw.sin_cos();

    TlvWriter::new()
        .packet_counter(index as u16)
        .sample_time_fine(index as u32 * 25)
        .quaternion([c as f32, 0.0, 0.0, s as f32])
        .acceleration([0.01, -0.02, 9.81])
        .rate_of_turn([0.0, 0.0, 1f32.to_radians()])
        .lat_lon(52.2393211, 6.8496714 + index as f64 * 1e-7)
        .altitude(43.25)
        .status_word(0x0000_0006)
        .finish()
}

/// `count` consecutive MTData2 frames built from [`sample_payload`].
pub fn sample_stream(count: usize) -> Vec<Frame> {
    (0..count)
        .map(|i| Frame::mt_data2(&sample_payload(i)).expect("sample payload fits in a frame"))
        .collect()
}

/// Raw bytes of [`sample_stream`], as a capture file would hold them.
pub fn sample_capture(count: usize) -> Vec<u8> {
    sample_stream(count).iter().flat_map(|f| f.as_bytes().to_vec()).collect()
}

/// A capture starting mid-frame, with noise between some frames and one corrupted checksum.
///
/// Returns the bytes and the packet counters a decoder should recover, in order.
pub fn noisy_capture(count: usize) -> (Vec<u8>, Vec<u16>) {
    let frames = sample_stream(count);
    let mut bytes = Vec::new();
    let mut expected = Vec::new();

    // tail of a frame whose start was never seen
    bytes.extend_from_slice(&[0x20, 0x10, 0x04, 0x00, 0x00]);

    for (i, frame) in frames.iter().enumerate() {
        let mut raw = frame.as_bytes().to_vec();
        if i == count / 2 {
            let last = raw.len() - 1;
            raw[last] ^= 0x5A;
        } else {
            expected.push(i as u16);
        }
        bytes.extend_from_slice(&raw);
        if i % 3 == 1 {
            bytes.extend_from_slice(NOISE);
        }
    }
    (bytes, expected)
}

/// Split `bytes` into chunks of a repeating size pattern.
pub fn chunked(bytes: &[u8], sizes: &[usize]) -> Vec<Vec<u8>> {
    let mut out = Vec::new();
    let mut rest = bytes;
    for size in sizes.iter().copied().filter(|s| *s > 0).cycle() {
        if rest.is_empty() {
            break;
        }
        let (head, tail) = rest.split_at(size.min(rest.len()));
        out.push(head.to_vec());
        rest = tail;
    }
    out
}
