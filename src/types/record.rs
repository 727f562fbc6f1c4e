//! Decoded measurement record

use serde::{Deserialize, Serialize};

use super::StatusWord;
use crate::protocol::orientation::{EulerAngles, RAD_TO_DEG, quaternion_to_euler};

/// Broken-down UTC time as reported by the device, plus its epoch conversion.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtcTime {
    /// Seconds since the Unix epoch, including the nanosecond fraction.
    pub epoch_seconds: f64,
    pub nanos: u32,
    pub year: u16,
    pub month: u8,
    pub day: u8,
    pub hour: u8,
    pub minute: u8,
    pub second: u8,
}

/// Identifies one field of a [`MeasurementRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Field {
    PacketCounter,
    SampleTimeFine,
    UtcTime,
    Euler,
    Quaternion,
    Acceleration,
    FreeAcceleration,
    RateOfTurn,
    MagneticField,
    DeltaV,
    DeltaQ,
    LatLon,
    Altitude,
    Velocity,
    Temperature,
    BaroPressure,
    StatusWord,
}

impl Field {
    pub const ALL: [Field; 17] = [
        Field::PacketCounter,
        Field::SampleTimeFine,
        Field::UtcTime,
        Field::Euler,
        Field::Quaternion,
        Field::Acceleration,
        Field::FreeAcceleration,
        Field::RateOfTurn,
        Field::MagneticField,
        Field::DeltaV,
        Field::DeltaQ,
        Field::LatLon,
        Field::Altitude,
        Field::Velocity,
        Field::Temperature,
        Field::BaroPressure,
        Field::StatusWord,
    ];
}

/// All measurements decoded from one MTData2 frame.
///
/// Every field is optional: `None` means the frame carried no record for it. The decoder
/// is the only writer; once handed out a record is read-only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MeasurementRecord {
    packet_counter: Option<u16>,
    sample_time_fine: Option<u32>,
    utc_time: Option<UtcTime>,
    euler: Option<EulerAngles>,
    quaternion: Option<[f64; 4]>,
    acceleration: Option<[f64; 3]>,
    free_acceleration: Option<[f64; 3]>,
    rate_of_turn: Option<[f64; 3]>,
    magnetic_field: Option<[f64; 3]>,
    delta_v: Option<[f64; 3]>,
    delta_q: Option<[f64; 4]>,
    lat_lon: Option<[f64; 2]>,
    altitude: Option<f64>,
    velocity: Option<[f64; 3]>,
    temperature: Option<f64>,
    baro_pressure: Option<u32>,
    status_word: Option<StatusWord>,
}

impl MeasurementRecord {
    /// Create an empty record with every field unavailable.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn packet_counter(&self) -> Option<u16> {
        self.packet_counter
    }

    /// Fine sample time in ticks of 10 kHz.
    pub fn sample_time_fine(&self) -> Option<u32> {
        self.sample_time_fine
    }

    pub fn utc_time(&self) -> Option<UtcTime> {
        self.utc_time
    }

    /// Roll, pitch and yaw in degrees.
    pub fn euler(&self) -> Option<EulerAngles> {
        self.euler
    }

    /// Orientation quaternion `[q0, q1, q2, q3]` (scalar first).
    pub fn quaternion(&self) -> Option<[f64; 4]> {
        self.quaternion
    }

    /// Calibrated acceleration in m/s².
    pub fn acceleration(&self) -> Option<[f64; 3]> {
        self.acceleration
    }

    /// Acceleration with gravity removed, in m/s².
    pub fn free_acceleration(&self) -> Option<[f64; 3]> {
        self.free_acceleration
    }

    /// Rate of turn in rad/s.
    pub fn rate_of_turn(&self) -> Option<[f64; 3]> {
        self.rate_of_turn
    }

    /// Rate of turn converted to deg/s.
    pub fn rate_of_turn_degrees(&self) -> Option<[f64; 3]> {
        self.rate_of_turn.map(|rot| rot.map(|v| v * RAD_TO_DEG))
    }

    /// Normalised magnetic field (arbitrary units).
    pub fn magnetic_field(&self) -> Option<[f64; 3]> {
        self.magnetic_field
    }

    /// Velocity increment over the sample period, in m/s.
    pub fn delta_v(&self) -> Option<[f64; 3]> {
        self.delta_v
    }

    /// Orientation increment quaternion over the sample period.
    pub fn delta_q(&self) -> Option<[f64; 4]> {
        self.delta_q
    }

    /// Latitude and longitude in degrees.
    pub fn lat_lon(&self) -> Option<[f64; 2]> {
        self.lat_lon
    }

    /// Height above the WGS-84 ellipsoid in metres.
    pub fn altitude(&self) -> Option<f64> {
        self.altitude
    }

    /// Velocity east, north, up in m/s.
    pub fn velocity(&self) -> Option<[f64; 3]> {
        self.velocity
    }

    /// Internal temperature in °C.
    pub fn temperature(&self) -> Option<f64> {
        self.temperature
    }

    /// Barometric pressure in Pa.
    pub fn baro_pressure(&self) -> Option<u32> {
        self.baro_pressure
    }

    pub fn status_word(&self) -> Option<StatusWord> {
        self.status_word
    }

    /// Whether the frame carried (or, for Euler, allowed deriving) the given field.
    pub fn is_available(&self, field: Field) -> bool {
        match field {
            Field::PacketCounter => self.packet_counter.is_some(),
            Field::SampleTimeFine => self.sample_time_fine.is_some(),
            Field::UtcTime => self.utc_time.is_some(),
            Field::Euler => self.euler.is_some(),
            Field::Quaternion => self.quaternion.is_some(),
            Field::Acceleration => self.acceleration.is_some(),
            Field::FreeAcceleration => self.free_acceleration.is_some(),
            Field::RateOfTurn => self.rate_of_turn.is_some(),
            Field::MagneticField => self.magnetic_field.is_some(),
            Field::DeltaV => self.delta_v.is_some(),
            Field::DeltaQ => self.delta_q.is_some(),
            Field::LatLon => self.lat_lon.is_some(),
            Field::Altitude => self.altitude.is_some(),
            Field::Velocity => self.velocity.is_some(),
            Field::Temperature => self.temperature.is_some(),
            Field::BaroPressure => self.baro_pressure.is_some(),
            Field::StatusWord => self.status_word.is_some(),
        }
    }

    /// Fields present in this record, in declaration order.
    pub fn available_fields(&self) -> Vec<Field> {
        Field::ALL.into_iter().filter(|field| self.is_available(*field)).collect()
    }

    /// True when no field was decoded.
    pub fn is_empty(&self) -> bool {
        self.available_fields().is_empty()
    }

    pub(crate) fn set_packet_counter(&mut self, value: u16) {
        self.packet_counter = Some(value);
    }

    pub(crate) fn set_sample_time_fine(&mut self, value: u32) {
        self.sample_time_fine = Some(value);
    }

    pub(crate) fn set_utc_time(&mut self, value: UtcTime) {
        self.utc_time = Some(value);
    }

    pub(crate) fn set_euler(&mut self, value: EulerAngles) {
        self.euler = Some(value);
    }

    /// Stores the quaternion and re-derives Euler angles from it.
    pub(crate) fn set_quaternion(&mut self, q: [f64; 4]) {
        self.quaternion = Some(q);
        self.euler = Some(quaternion_to_euler(q[0], q[1], q[2], q[3]));
    }

    pub(crate) fn set_acceleration(&mut self, value: [f64; 3]) {
        self.acceleration = Some(value);
    }

    pub(crate) fn set_free_acceleration(&mut self, value: [f64; 3]) {
        self.free_acceleration = Some(value);
    }

    pub(crate) fn set_rate_of_turn(&mut self, value: [f64; 3]) {
        self.rate_of_turn = Some(value);
    }

    pub(crate) fn set_magnetic_field(&mut self, value: [f64; 3]) {
        self.magnetic_field = Some(value);
    }

    pub(crate) fn set_delta_v(&mut self, value: [f64; 3]) {
        self.delta_v = Some(value);
    }

    pub(crate) fn set_delta_q(&mut self, value: [f64; 4]) {
        self.delta_q = Some(value);
    }

    pub(crate) fn set_lat_lon(&mut self, value: [f64; 2]) {
        self.lat_lon = Some(value);
    }

    pub(crate) fn set_altitude(&mut self, value: f64) {
        self.altitude = Some(value);
    }

    pub(crate) fn set_velocity(&mut self, value: [f64; 3]) {
        self.velocity = Some(value);
    }

    pub(crate) fn set_temperature(&mut self, value: f64) {
        self.temperature = Some(value);
    }

    pub(crate) fn set_baro_pressure(&mut self, value: u32) {
        self.baro_pressure = Some(value);
    }

    pub(crate) fn set_status_word(&mut self, value: StatusWord) {
        self.status_word = Some(value);
    }
}
