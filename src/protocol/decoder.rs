//! MTData2 payload decoding
//!
//! Each known data identifier maps to a [`FieldKind`] through a static dispatch table;
//! the kind knows the wire layout and which [`MeasurementRecord`] field it fills.
//! Supporting a new identifier means adding a table row and a kind, nothing else.
//!
//! ```rust
//! use xbus::{Field, FieldDecoder, TlvWriter};
//!
//! let payload = TlvWriter::new()
//!     .packet_counter(42)
//!     .record(0x9999, &[0x01, 0x02])
//!     .quaternion([1.0, 0.0, 0.0, 0.0])
//!     .finish();
//!
//! let report = FieldDecoder::new().decode(&payload);
//! assert!(report.is_complete());
//! assert_eq!(report.record.packet_counter(), Some(42));
//! assert!(report.record.is_available(Field::Euler));
//! assert_eq!(report.warnings.len(), 1); // the unknown 0x9999
//! ```

use chrono::NaiveDate;
use tracing::{debug, trace, warn};

use super::fixed_point::Fp1632;
use super::orientation::EulerAngles;
use super::tlv::{TlvRecord, TlvRecords};
use crate::types::xbus_ids::{data_id, message};
use crate::types::{FieldValue, Frame, MeasurementRecord, StatusWord, UtcTime, read_field};
use crate::{Result, XbusError};

/// Decoding strategy for one data identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    PacketCounter,
    SampleTimeFine,
    UtcTime,
    Euler,
    Quaternion,
    Acceleration,
    FreeAcceleration,
    RateOfTurn,
    MagneticField,
    LatLon,
    Altitude,
    Velocity,
    StatusWord,
    Temperature,
    BaroPressure,
    DeltaV,
    DeltaQ,
}

/// Identifier → strategy table.
pub const FIELD_TABLE: &[(u16, FieldKind)] = &[
    (data_id::PACKET_COUNTER, FieldKind::PacketCounter),
    (data_id::SAMPLE_TIME_FINE, FieldKind::SampleTimeFine),
    (data_id::UTC_TIME, FieldKind::UtcTime),
    (data_id::EULER_ANGLES, FieldKind::Euler),
    (data_id::QUATERNION, FieldKind::Quaternion),
    (data_id::ACCELERATION, FieldKind::Acceleration),
    (data_id::FREE_ACCELERATION, FieldKind::FreeAcceleration),
    (data_id::RATE_OF_TURN, FieldKind::RateOfTurn),
    (data_id::MAGNETIC_FIELD, FieldKind::MagneticField),
    (data_id::LAT_LON, FieldKind::LatLon),
    (data_id::ALTITUDE_ELLIPSOID, FieldKind::Altitude),
    (data_id::VELOCITY_XYZ, FieldKind::Velocity),
    (data_id::STATUS_WORD, FieldKind::StatusWord),
    (data_id::TEMPERATURE, FieldKind::Temperature),
    (data_id::BARO_PRESSURE, FieldKind::BaroPressure),
    (data_id::DELTA_V, FieldKind::DeltaV),
    (data_id::DELTA_Q, FieldKind::DeltaQ),
];

impl FieldKind {
    /// Look up the strategy for a data identifier.
    pub fn for_id(id: u16) -> Option<Self> {
        FIELD_TABLE.iter().find(|(known, _)| *known == id).map(|(_, kind)| *kind)
    }

    /// Minimum value length the layout requires.
    pub fn wire_size(self) -> usize {
        match self {
            FieldKind::PacketCounter => u16::SIZE,
            FieldKind::SampleTimeFine
            | FieldKind::StatusWord
            | FieldKind::Temperature
            | FieldKind::BaroPressure => u32::SIZE,
            FieldKind::UtcTime => RawUtc::SIZE,
            FieldKind::Euler
            | FieldKind::Acceleration
            | FieldKind::FreeAcceleration
            | FieldKind::RateOfTurn
            | FieldKind::MagneticField
            | FieldKind::DeltaV => <[f32; 3]>::SIZE,
            FieldKind::Quaternion | FieldKind::DeltaQ => <[f32; 4]>::SIZE,
            FieldKind::LatLon => <[Fp1632; 2]>::SIZE,
            FieldKind::Altitude => Fp1632::SIZE,
            FieldKind::Velocity => <[Fp1632; 3]>::SIZE,
        }
    }

    /// Decode `value` and store it in `record`.
    pub fn apply(self, id: u16, value: &[u8], record: &mut MeasurementRecord) -> Result<()> {
        match self {
            FieldKind::PacketCounter => record.set_packet_counter(read_field(id, value)?),
            FieldKind::SampleTimeFine => record.set_sample_time_fine(read_field(id, value)?),
            FieldKind::UtcTime => {
                let raw: RawUtc = read_field(id, value)?;
                record.set_utc_time(raw.to_utc(id)?);
            }
            FieldKind::Euler => record.set_euler(EulerAngles::from(read_f32s::<3>(id, value)?)),
            FieldKind::Quaternion => record.set_quaternion(read_f32s::<4>(id, value)?),
            FieldKind::Acceleration => record.set_acceleration(read_f32s(id, value)?),
            FieldKind::FreeAcceleration => record.set_free_acceleration(read_f32s(id, value)?),
            FieldKind::RateOfTurn => record.set_rate_of_turn(read_f32s(id, value)?),
            FieldKind::MagneticField => record.set_magnetic_field(read_f32s(id, value)?),
            FieldKind::DeltaV => record.set_delta_v(read_f32s(id, value)?),
            FieldKind::DeltaQ => record.set_delta_q(read_f32s(id, value)?),
            FieldKind::LatLon => record.set_lat_lon(read_fixed(id, value)?),
            FieldKind::Altitude => {
                let altitude: Fp1632 = read_field(id, value)?;
                record.set_altitude(altitude.value());
            }
            FieldKind::Velocity => record.set_velocity(read_fixed(id, value)?),
            FieldKind::StatusWord => record.set_status_word(StatusWord(read_field(id, value)?)),
            FieldKind::Temperature => {
                let celsius: f32 = read_field(id, value)?;
                record.set_temperature(f64::from(celsius));
            }
            FieldKind::BaroPressure => record.set_baro_pressure(read_field(id, value)?),
        }
        Ok(())
    }
}

fn read_f32s<const N: usize>(id: u16, value: &[u8]) -> Result<[f64; N]> {
    let raw: [f32; N] = read_field(id, value)?;
    Ok(raw.map(f64::from))
}

fn read_fixed<const N: usize>(id: u16, value: &[u8]) -> Result<[f64; N]> {
    let raw: [Fp1632; N] = read_field(id, value)?;
    Ok(raw.map(Fp1632::value))
}

/// UTC time as laid out on the wire (the trailing flags byte is ignored).
struct RawUtc {
    nanos: u32,
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
}

impl FieldValue for RawUtc {
    const SIZE: usize = 11;

    fn read_be(bytes: &[u8]) -> Self {
        Self {
            nanos: u32::read_be(&bytes[0..4]),
            year: u16::read_be(&bytes[4..6]),
            month: bytes[6],
            day: bytes[7],
            hour: bytes[8],
            minute: bytes[9],
            second: bytes[10],
        }
    }
}

impl RawUtc {
    fn to_utc(&self, id: u16) -> Result<UtcTime> {
        let timestamp = NaiveDate::from_ymd_opt(
            i32::from(self.year),
            u32::from(self.month),
            u32::from(self.day),
        )
        .and_then(|date| {
            // chrono encodes a leap second as second 59 with an overflowing fraction
            let (second, nanos) = match self.second {
                60 if self.nanos < 1_000_000_000 => (59, self.nanos + 1_000_000_000),
                second => (u32::from(second), self.nanos),
            };
            date.and_hms_nano_opt(u32::from(self.hour), u32::from(self.minute), second, nanos)
        })
        .ok_or_else(|| XbusError::InvalidField {
            data_id: id,
            details: format!(
                "{:04}-{:02}-{:02} {:02}:{:02}:{:02}.{:09}",
                self.year, self.month, self.day, self.hour, self.minute, self.second, self.nanos
            ),
        })?
        .and_utc();

        Ok(UtcTime {
            epoch_seconds: timestamp.timestamp() as f64
                + f64::from(timestamp.timestamp_subsec_nanos()) * 1e-9,
            nanos: self.nanos,
            year: self.year,
            month: self.month,
            day: self.day,
            hour: self.hour,
            minute: self.minute,
            second: self.second,
        })
    }
}

/// Outcome of decoding one payload.
///
/// Decoding is best effort: `record` holds everything decoded before any error, and
/// `error` says why decoding stopped early, if it did.
#[derive(Debug, Default)]
pub struct DecodeReport {
    pub record: MeasurementRecord,
    /// Non-fatal anomalies: unknown identifiers, short or invalid values.
    pub warnings: Vec<XbusError>,
    /// Set when the rest of the payload had to be abandoned.
    pub error: Option<XbusError>,
}

impl DecodeReport {
    /// True when the whole payload was walked.
    pub fn is_complete(&self) -> bool {
        self.error.is_none()
    }

    /// The record, or the error that cut decoding short.
    pub fn into_result(self) -> Result<MeasurementRecord> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.record),
        }
    }
}

/// Decoder for MTData2 payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct FieldDecoder;

impl FieldDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode a TLV payload into a record.
    pub fn decode(&self, payload: &[u8]) -> DecodeReport {
        let mut report = DecodeReport::default();

        for item in TlvRecords::new(payload) {
            match item {
                Ok(tlv) => {
                    if let Err(err) = Self::apply(tlv, &mut report.record) {
                        warn!("{}", err);
                        report.warnings.push(err);
                    }
                }
                Err(err) => {
                    warn!("Abandoning payload: {}", err);
                    report.error = Some(err);
                }
            }
        }

        trace!(
            "Decoded {} field(s), {} warning(s)",
            report.record.available_fields().len(),
            report.warnings.len()
        );
        report
    }

    /// Decode an MTData2 frame; other message types are rejected.
    pub fn decode_frame(&self, frame: &Frame) -> Result<DecodeReport> {
        if !frame.is_mt_data2() {
            return Err(XbusError::UnexpectedMessage {
                expected: message::MT_DATA2,
                found: frame.message_id(),
            });
        }
        Ok(self.decode(frame.payload()))
    }

    fn apply(tlv: TlvRecord<'_>, record: &mut MeasurementRecord) -> Result<()> {
        match FieldKind::for_id(tlv.data_id) {
            Some(kind) => kind.apply(tlv.data_id, tlv.value, record),
            None => {
                debug!("Skipping unknown data id {:#06x} ({} bytes)", tlv.data_id, tlv.value.len());
                Err(XbusError::unknown_field(tlv.data_id, tlv.value.len()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::TlvWriter;
    use crate::types::Field;

    fn decode(payload: &[u8]) -> DecodeReport {
        FieldDecoder::new().decode(payload)
    }

    fn assert_close(actual: f64, expected: f64, tolerance: f64) {
        assert!((actual - expected).abs() <= tolerance, "expected {expected}, got {actual}");
    }

    #[test]
    fn table_has_unique_ids_and_matching_sizes() {
        for (i, (id, kind)) in FIELD_TABLE.iter().enumerate() {
            assert!(FIELD_TABLE[i + 1..].iter().all(|(other, _)| other != id), "{id:#06x} twice");
            assert_eq!(FieldKind::for_id(*id), Some(*kind));
            assert!(kind.wire_size() > 0);
        }
        assert_eq!(FIELD_TABLE.len(), Field::ALL.len());
        assert_eq!(FieldKind::for_id(0x9999), None);
    }

    #[test]
    fn identity_quaternion_end_to_end() {
        let report = decode(&TlvWriter::new().quaternion([1.0, 0.0, 0.0, 0.0]).finish());
        assert!(report.is_complete());
        assert!(report.warnings.is_empty());

        let record = report.record;
        assert_eq!(record.quaternion(), Some([1.0, 0.0, 0.0, 0.0]));
        let euler = record.euler().expect("euler derived from quaternion");
        assert_close(euler.roll, 0.0, 1e-9);
        assert_close(euler.pitch, 0.0, 1e-9);
        assert_close(euler.yaw, 0.0, 1e-9);
    }

    #[test]
    fn unknown_id_is_skipped_with_warning() {
        let payload = TlvWriter::new()
            .record(0x9999, &[0xDE, 0xAD])
            .packet_counter(42)
            .finish();
        let report = decode(&payload);

        assert!(report.is_complete());
        assert_eq!(report.record.packet_counter(), Some(42));
        assert!(report.record.is_available(Field::PacketCounter));
        assert!(matches!(
            report.warnings[..],
            [XbusError::UnknownField { data_id: 0x9999, len: 2 }]
        ));
    }

    #[test]
    fn truncation_keeps_earlier_fields() {
        let mut payload = TlvWriter::new().packet_counter(7).finish();
        // acceleration declares 12 bytes but only 4 follow
        payload.extend_from_slice(&[0x40, 0x20, 0x0C, 0x00, 0x00, 0x00, 0x00]);
        let report = decode(&payload);

        assert!(!report.is_complete());
        assert!(matches!(
            report.error,
            Some(XbusError::TruncatedRecord { data_id: 0x4020, declared: 12, remaining: 4, .. })
        ));
        assert_eq!(report.record.packet_counter(), Some(7));
        assert!(!report.record.is_available(Field::Acceleration));
    }

    #[test]
    fn truncation_leaves_later_fields_unavailable() {
        let mut payload = TlvWriter::new().packet_counter(1).finish();
        payload.extend_from_slice(&[0x10, 0x60, 0x08, 0x00]);
        let report = decode(&payload);
        assert!(report.error.is_some());
        assert!(!report.record.is_available(Field::SampleTimeFine));
        assert!(report.into_result().is_err());
    }

    #[test]
    fn short_known_record_is_a_warning() {
        let payload = TlvWriter::new()
            .record(data_id::PACKET_COUNTER, &[0x01])
            .sample_time_fine(1000)
            .finish();
        let report = decode(&payload);
        assert!(report.is_complete());
        assert!(matches!(
            report.warnings[..],
            [XbusError::FieldLength { data_id: 0x1020, expected: 2, actual: 1 }]
        ));
        assert_eq!(report.record.packet_counter(), None);
        assert_eq!(report.record.sample_time_fine(), Some(1000));
    }

    #[test]
    fn decodes_every_known_field() {
        let payload = TlvWriter::new()
            .packet_counter(0xBEEF)
            .sample_time_fine(123_456)
            .utc_time(500_000_000, 2024, 3, 15, 12, 30, 45)
            .acceleration([0.1, -0.2, 9.81])
            .free_acceleration([0.0, 0.5, -0.5])
            .rate_of_turn([0.01, 0.02, 0.03])
            .magnetic_field([0.4, 0.1, -0.9])
            .delta_v([0.001, 0.002, 0.003])
            .delta_q([1.0, 0.0, 0.0, 0.0])
            .lat_lon(52.2393211, 6.8496714)
            .altitude(43.25)
            .velocity([1.5, -0.25, 0.125])
            .status_word(0x0000_0006)
            .temperature(24.5)
            .baro_pressure(101_325)
            .finish();
        let report = decode(&payload);
        assert!(report.is_complete());
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        let record = report.record;
        assert_eq!(record.packet_counter(), Some(0xBEEF));
        assert_eq!(record.sample_time_fine(), Some(123_456));

        let utc = record.utc_time().unwrap();
        assert_eq!((utc.year, utc.month, utc.day), (2024, 3, 15));
        assert_close(utc.epoch_seconds, 1_710_505_845.5, 1e-6);

        assert_close(record.acceleration().unwrap()[2], 9.81, 1e-6);
        assert_close(record.free_acceleration().unwrap()[1], 0.5, 1e-9);
        assert_close(record.rate_of_turn().unwrap()[0], 0.01, 1e-9);
        assert_close(record.magnetic_field().unwrap()[2], -0.9, 1e-6);
        assert_close(record.delta_v().unwrap()[2], 0.003, 1e-9);
        assert_eq!(record.delta_q(), Some([1.0, 0.0, 0.0, 0.0]));

        let step = 1.0 / 4_294_967_296.0;
        let [lat, lon] = record.lat_lon().unwrap();
        assert_close(lat, 52.2393211, step);
        assert_close(lon, 6.8496714, step);
        assert_close(record.altitude().unwrap(), 43.25, step);
        assert_eq!(record.velocity(), Some([1.5, -0.25, 0.125]));

        assert_eq!(record.status_word(), Some(StatusWord(6)));
        assert_eq!(record.temperature(), Some(24.5));
        assert_eq!(record.baro_pressure(), Some(101_325));

        // no quaternion or euler record was sent
        assert!(!record.is_available(Field::Euler));
        assert!(!record.is_available(Field::Quaternion));
    }

    #[test]
    fn device_euler_is_stored_as_sent() {
        let report = decode(&TlvWriter::new().euler([10.0, -5.0, 180.0]).finish());
        let euler = report.record.euler().unwrap();
        assert_eq!(euler.as_array(), [10.0, -5.0, 180.0]);
        assert!(!report.record.is_available(Field::Quaternion));
    }

    #[test]
    fn invalid_utc_is_a_warning() {
        let report = decode(&TlvWriter::new().utc_time(0, 0, 0, 0, 0, 0, 0).packet_counter(1).finish());
        assert!(report.is_complete());
        assert!(matches!(report.warnings[..], [XbusError::InvalidField { data_id: 0x1010, .. }]));
        assert!(!report.record.is_available(Field::UtcTime));
        assert_eq!(report.record.packet_counter(), Some(1));
    }

    #[test]
    fn impossible_calendar_dates_are_rejected() {
        for (year, month, day) in [(2023, 2, 30), (2023, 2, 29), (2024, 4, 31), (2024, 13, 1)] {
            let payload = TlvWriter::new().utc_time(0, year, month, day, 0, 0, 0).finish();
            let report = decode(&payload);
            assert!(
                matches!(report.warnings[..], [XbusError::InvalidField { data_id: 0x1010, .. }]),
                "{year}-{month}-{day}"
            );
            assert!(!report.record.is_available(Field::UtcTime));
        }

        let report = decode(&TlvWriter::new().utc_time(0, 2024, 2, 29, 0, 0, 0).finish());
        assert!(report.warnings.is_empty());
        assert_close(report.record.utc_time().unwrap().epoch_seconds, 1_709_164_800.0, 1e-6);
    }

    #[test]
    fn utc_epoch_boundaries() {
        let epoch = |year, month, day, second| {
            let payload = TlvWriter::new().utc_time(0, year, month, day, 23, 59, second).finish();
            decode(&payload).record.utc_time().map(|utc| utc.epoch_seconds)
        };
        assert_eq!(epoch(1970, 1, 1, 59), Some(86_399.0));
        assert_eq!(epoch(2000, 2, 29, 59), Some(951_868_799.0));
        // leap second lands between 23:59:59 and the next midnight
        assert_eq!(epoch(2016, 12, 31, 60), Some(1_483_228_800.0));
        assert_eq!(epoch(2016, 12, 31, 61), None);
    }

    #[test]
    fn decode_frame_rejects_other_messages() {
        let frame = Frame::build(message::GO_TO_CONFIG, &[]).unwrap();
        let err = FieldDecoder::new().decode_frame(&frame).unwrap_err();
        assert!(matches!(err, XbusError::UnexpectedMessage { expected: 0x36, found: 0x30 }));

        let frame = Frame::mt_data2(&TlvWriter::new().packet_counter(9).finish()).unwrap();
        let record = FieldDecoder::new().decode_frame(&frame).unwrap().into_result().unwrap();
        assert_eq!(record.packet_counter(), Some(9));
    }

    #[test]
    fn empty_payload_decodes_to_empty_record() {
        let report = decode(&[]);
        assert!(report.is_complete());
        assert!(report.record.is_empty());
    }
}
