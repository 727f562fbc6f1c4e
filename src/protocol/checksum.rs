//! Xbus frame checksum
//!
//! The checksum byte is chosen so that every byte after the preamble, checksum
//! included, sums to zero modulo 256.

/// Compute the checksum for a frame given without its trailing checksum byte.
///
/// The first byte (the `0xFA` preamble) is excluded from the sum.
pub fn compute(frame_without_checksum: &[u8]) -> u8 {
    frame_without_checksum
        .iter()
        .skip(1)
        .fold(0u8, |acc, byte| acc.wrapping_add(*byte))
        .wrapping_neg()
}

/// Verify a complete frame against its trailing checksum byte.
pub fn validate(frame: &[u8]) -> bool {
    match frame.split_last() {
        Some((checksum, body)) if !body.is_empty() => compute(body) == *checksum,
        _ => false,
    }
}
