//! MTData2 tag-length-value records
//!
//! An MTData2 payload is a run of `[id: u16 BE][len: u8][value: len bytes]` records with
//! no padding. [`TlvRecords`] walks them; [`TlvWriter`] builds them.

use crate::types::xbus_ids::data_id;
use crate::protocol::fixed_point;
use crate::{Result, XbusError};

/// Bytes of `id` + `len` preceding every value.
pub const TLV_HEADER_LEN: usize = 3;

/// One record borrowed from a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TlvRecord<'a> {
    pub data_id: u16,
    /// Offset of the record header within the payload.
    pub offset: usize,
    pub value: &'a [u8],
}

/// Iterator over the records of a payload.
///
/// Yields `Err(TruncatedRecord)` once if the final record does not fit, then stops.
#[derive(Debug, Clone)]
pub struct TlvRecords<'a> {
    payload: &'a [u8],
    offset: usize,
}

impl<'a> TlvRecords<'a> {
    pub fn new(payload: &'a [u8]) -> Self {
        Self { payload, offset: 0 }
    }
}

impl<'a> Iterator for TlvRecords<'a> {
    type Item = Result<TlvRecord<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let offset = self.offset;
        let rest = self.payload.get(offset..).filter(|rest| !rest.is_empty())?;

        if rest.len() < TLV_HEADER_LEN {
            self.offset = self.payload.len();
            let data_id = match rest {
                [hi, lo, ..] => u16::from_be_bytes([*hi, *lo]),
                _ => 0,
            };
            return Some(Err(XbusError::TruncatedRecord {
                data_id,
                offset,
                declared: TLV_HEADER_LEN,
                remaining: rest.len(),
            }));
        }

        let data_id = u16::from_be_bytes([rest[0], rest[1]]);
        let declared = usize::from(rest[2]);
        let available = rest.len() - TLV_HEADER_LEN;
        if declared > available {
            self.offset = self.payload.len();
            return Some(Err(XbusError::TruncatedRecord {
                data_id,
                offset,
                declared,
                remaining: available,
            }));
        }

        self.offset = offset + TLV_HEADER_LEN + declared;
        Some(Ok(TlvRecord {
            data_id,
            offset,
            value: &rest[TLV_HEADER_LEN..TLV_HEADER_LEN + declared],
        }))
    }
}

/// Builder for MTData2 payloads.
///
/// ```rust
/// use xbus::{Frame, TlvWriter};
///
/// let payload = TlvWriter::new().packet_counter(42).quaternion([1.0, 0.0, 0.0, 0.0]).finish();
/// let frame = Frame::mt_data2(&payload).unwrap();
/// assert_eq!(frame.payload().len(), 5 + 19);
/// ```
#[derive(Debug, Clone, Default)]
pub struct TlvWriter {
    buf: Vec<u8>,
}

impl TlvWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a raw record.
    ///
    /// # Panics
    ///
    /// Panics if `value` is longer than 255 bytes.
    pub fn record(mut self, data_id: u16, value: &[u8]) -> Self {
        let len = u8::try_from(value.len()).expect("TLV value longer than 255 bytes");
        self.buf.extend_from_slice(&data_id.to_be_bytes());
        self.buf.push(len);
        self.buf.extend_from_slice(value);
        self
    }

    fn floats(self, data_id: u16, values: &[f32]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| v.to_be_bytes()).collect();
        self.record(data_id, &bytes)
    }

    fn fixed(self, data_id: u16, values: &[f64]) -> Self {
        let bytes: Vec<u8> = values.iter().flat_map(|v| fixed_point::encode(*v)).collect();
        self.record(data_id, &bytes)
    }

    pub fn packet_counter(self, counter: u16) -> Self {
        self.record(data_id::PACKET_COUNTER, &counter.to_be_bytes())
    }

    pub fn sample_time_fine(self, ticks: u32) -> Self {
        self.record(data_id::SAMPLE_TIME_FINE, &ticks.to_be_bytes())
    }

    /// UTC time record, including the trailing validity-flags byte the device sends.
    #[allow(clippy::too_many_arguments)]
    pub fn utc_time(
        self,
        nanos: u32,
        year: u16,
        month: u8,
        day: u8,
        hour: u8,
        minute: u8,
        second: u8,
    ) -> Self {
        let mut bytes = Vec::with_capacity(12);
        bytes.extend_from_slice(&nanos.to_be_bytes());
        bytes.extend_from_slice(&year.to_be_bytes());
        bytes.extend_from_slice(&[month, day, hour, minute, second, 0x07]);
        self.record(data_id::UTC_TIME, &bytes)
    }

    pub fn euler(self, rpy: [f32; 3]) -> Self {
        self.floats(data_id::EULER_ANGLES, &rpy)
    }

    pub fn quaternion(self, q: [f32; 4]) -> Self {
        self.floats(data_id::QUATERNION, &q)
    }

    pub fn acceleration(self, acc: [f32; 3]) -> Self {
        self.floats(data_id::ACCELERATION, &acc)
    }

    pub fn free_acceleration(self, acc: [f32; 3]) -> Self {
        self.floats(data_id::FREE_ACCELERATION, &acc)
    }

    pub fn rate_of_turn(self, rot: [f32; 3]) -> Self {
        self.floats(data_id::RATE_OF_TURN, &rot)
    }

    pub fn magnetic_field(self, mag: [f32; 3]) -> Self {
        self.floats(data_id::MAGNETIC_FIELD, &mag)
    }

    pub fn delta_v(self, dv: [f32; 3]) -> Self {
        self.floats(data_id::DELTA_V, &dv)
    }

    pub fn delta_q(self, dq: [f32; 4]) -> Self {
        self.floats(data_id::DELTA_Q, &dq)
    }

    pub fn temperature(self, celsius: f32) -> Self {
        self.floats(data_id::TEMPERATURE, &[celsius])
    }

    pub fn baro_pressure(self, pascal: u32) -> Self {
        self.record(data_id::BARO_PRESSURE, &pascal.to_be_bytes())
    }

    pub fn lat_lon(self, latitude: f64, longitude: f64) -> Self {
        self.fixed(data_id::LAT_LON, &[latitude, longitude])
    }

    pub fn altitude(self, metres: f64) -> Self {
        self.fixed(data_id::ALTITUDE_ELLIPSOID, &[metres])
    }

    pub fn velocity(self, enu: [f64; 3]) -> Self {
        self.fixed(data_id::VELOCITY_XYZ, &enu)
    }

    pub fn status_word(self, word: u32) -> Self {
        self.record(data_id::STATUS_WORD, &word.to_be_bytes())
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walks_contiguous_records() {
        let payload = TlvWriter::new()
            .packet_counter(1)
            .record(0x9999, &[0xAA, 0xBB])
            .status_word(0x0000_0002)
            .finish();

        let records: Vec<_> = TlvRecords::new(&payload).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].data_id, data_id::PACKET_COUNTER);
        assert_eq!(records[0].offset, 0);
        assert_eq!(records[1].data_id, 0x9999);
        assert_eq!(records[1].offset, 5);
        assert_eq!(records[1].value, &[0xAA, 0xBB]);
        assert_eq!(records[2].offset, 10);
    }

    #[test]
    fn zero_length_records_are_valid() {
        let payload = TlvWriter::new().record(0x1234, &[]).packet_counter(3).finish();
        let records: Vec<_> = TlvRecords::new(&payload).collect::<Result<_>>().unwrap();
        assert_eq!(records.len(), 2);
        assert!(records[0].value.is_empty());
    }

    #[test]
    fn truncated_value_stops_iteration() {
        let mut payload = TlvWriter::new().packet_counter(1).finish();
        payload.extend_from_slice(&[0x20, 0x10, 0x10, 0x00, 0x00]);

        let mut records = TlvRecords::new(&payload);
        assert!(records.next().unwrap().is_ok());
        match records.next().unwrap() {
            Err(XbusError::TruncatedRecord { data_id, offset, declared, remaining }) => {
                assert_eq!(data_id, 0x2010);
                assert_eq!(offset, 5);
                assert_eq!(declared, 16);
                assert_eq!(remaining, 2);
            }
            other => panic!("Expected TruncatedRecord, got {other:?}"),
        }
        assert!(records.next().is_none());
    }

    #[test]
    fn truncated_header_is_reported() {
        let payload = [0x10, 0x20];
        let mut records = TlvRecords::new(&payload);
        assert!(matches!(
            records.next(),
            Some(Err(XbusError::TruncatedRecord { data_id: 0x1020, remaining: 2, .. }))
        ));
        assert!(records.next().is_none());
    }

    #[test]
    fn empty_payload_has_no_records() {
        assert!(TlvRecords::new(&[]).next().is_none());
    }

    #[test]
    #[should_panic(expected = "longer than 255")]
    fn oversized_record_panics() {
        let _ = TlvWriter::new().record(0x0001, &[0u8; 256]);
    }
}
