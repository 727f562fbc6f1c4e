//! FP1632 fixed-point codec
//!
//! Positions and velocities are sent as 48-bit fixed point: 16 signed integer bits and
//! 32 fractional bits, transmitted as a big-endian `i32` fractional word followed by a
//! big-endian `i16` integer word.

use serde::{Deserialize, Serialize};

use crate::types::FieldValue;

/// Encoded size of one FP1632 value.
pub const FP1632_SIZE: usize = 6;

const SCALE: f64 = 4_294_967_296.0; // 2^32
const RAW_MIN: i64 = -(1 << 47);
const RAW_MAX: i64 = (1 << 47) - 1;

/// Decode a 6-byte FP1632 value.
pub fn decode(bytes: [u8; FP1632_SIZE]) -> f64 {
    let fractional = i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
    let integer = i16::from_be_bytes([bytes[4], bytes[5]]);

    // The fractional word is masked, not sign-extended, before combining
    let raw = (i64::from(integer) << 32) | (i64::from(fractional) & 0xFFFF_FFFF);
    raw as f64 / SCALE
}

/// Encode a value as FP1632, rounding to the nearest step and saturating at the format range.
pub fn encode(value: f64) -> [u8; FP1632_SIZE] {
    let raw = if value.is_nan() {
        0
    } else {
        ((value * SCALE).round() as i64).clamp(RAW_MIN, RAW_MAX)
    };

    let fractional = (raw & 0xFFFF_FFFF) as u32;
    let integer = (raw >> 32) as i16;

    let mut bytes = [0u8; FP1632_SIZE];
    bytes[..4].copy_from_slice(&fractional.to_be_bytes());
    bytes[4..].copy_from_slice(&integer.to_be_bytes());
    bytes
}

/// A decoded FP1632 value.
#[derive(Debug, Clone, Copy, Default, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Fp1632(pub f64);

impl Fp1632 {
    pub fn value(self) -> f64 {
        self.0
    }
}

impl FieldValue for Fp1632 {
    const SIZE: usize = FP1632_SIZE;

    fn read_be(bytes: &[u8]) -> Self {
        Fp1632(decode([bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]]))
    }
}
