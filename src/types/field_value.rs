//! Big-endian field parsing trait and implementations

use crate::{Result, XbusError};

/// Trait for types that can be parsed from an MTData2 record value.
///
/// All multi-byte quantities on the wire are big-endian.
pub trait FieldValue: Sized {
    /// Number of bytes this value occupies on the wire.
    const SIZE: usize;

    /// Parse from exactly `Self::SIZE` bytes.
    fn read_be(bytes: &[u8]) -> Self;
}

/// Read a `T` from the start of `value`, reporting short records against `data_id`.
///
/// Trailing bytes beyond `T::SIZE` are ignored.
pub fn read_field<T: FieldValue>(data_id: u16, value: &[u8]) -> Result<T> {
    let bytes = value.get(..T::SIZE).ok_or(XbusError::FieldLength {
        data_id,
        expected: T::SIZE,
        actual: value.len(),
    })?;
    Ok(T::read_be(bytes))
}

impl FieldValue for u8 {
    const SIZE: usize = 1;

    fn read_be(bytes: &[u8]) -> Self {
        bytes[0]
    }
}

impl FieldValue for u16 {
    const SIZE: usize = 2;

    fn read_be(bytes: &[u8]) -> Self {
        u16::from_be_bytes([bytes[0], bytes[1]])
    }
}

impl FieldValue for i16 {
    const SIZE: usize = 2;

    fn read_be(bytes: &[u8]) -> Self {
        i16::from_be_bytes([bytes[0], bytes[1]])
    }
}

impl FieldValue for u32 {
    const SIZE: usize = 4;

    fn read_be(bytes: &[u8]) -> Self {
        u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl FieldValue for i32 {
    const SIZE: usize = 4;

    fn read_be(bytes: &[u8]) -> Self {
        i32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

impl FieldValue for f32 {
    const SIZE: usize = 4;

    fn read_be(bytes: &[u8]) -> Self {
        f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]])
    }
}

// Fixed-size vectors (acceleration, quaternion, ...) are packed without padding
impl<T: FieldValue, const N: usize> FieldValue for [T; N] {
    const SIZE: usize = T::SIZE * N;

    fn read_be(bytes: &[u8]) -> Self {
        std::array::from_fn(|i| T::read_be(&bytes[i * T::SIZE..(i + 1) * T::SIZE]))
    }
}
