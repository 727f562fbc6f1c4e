//! CSV record log
//!
//! One row per record, one column per scalar. A field the record does not carry leaves
//! its cells empty, so rows from differently configured devices still line up.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

use tracing::{debug, info};

use crate::provider::RecordSink;
use crate::types::{MeasurementRecord, UtcTime};
use crate::{Result, XbusError};

const MEASUREMENT_COLUMNS: [&str; 32] = [
    "packetCounter",
    "sampleTimeFine",
    "utcTime",
    "Roll",
    "Pitch",
    "Yaw",
    "q0",
    "q1",
    "q2",
    "q3",
    "RateOfTurnX",
    "RateOfTurnY",
    "RateOfTurnZ",
    "AccelerationX",
    "AccelerationY",
    "AccelerationZ",
    "MagneticFieldX",
    "MagneticFieldY",
    "MagneticFieldZ",
    "DeltaVX",
    "DeltaVY",
    "DeltaVZ",
    "DeltaQ0",
    "DeltaQ1",
    "DeltaQ2",
    "DeltaQ3",
    "FreeAccX",
    "FreeAccY",
    "FreeAccZ",
    "BarometricPressure",
    "Temperature",
    "StatusWord",
];

const POSITION_VELOCITY_COLUMNS: [&str; 6] =
    ["Latitude", "Longitude", "Altitude", "VelocityEast", "VelocityNorth", "VelocityUp"];

/// Appends records to a CSV file or any other writer.
///
/// Rate of turn is logged in degrees per second.
pub struct CsvSink<W: Write> {
    writer: csv::Writer<W>,
    target: String,
    log_position_velocity: bool,
    rows_written: u64,
}

impl CsvSink<File> {
    /// Open `path` for appending, creating it and its parent directories if needed.
    ///
    /// The header row is written only when the file is new (or empty), so repeated runs
    /// keep extending the same log.
    pub fn create<P: AsRef<Path>>(path: P, log_position_velocity: bool) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| XbusError::file_error(parent.to_path_buf(), e))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| XbusError::file_error(path.to_path_buf(), e))?;
        let is_new = file
            .metadata()
            .map_err(|e| XbusError::file_error(path.to_path_buf(), e))?
            .len()
            == 0;

        info!("Logging records to {} ({})", path.display(), if is_new { "new" } else { "append" });
        Self::new(file, path.display().to_string(), log_position_velocity, is_new)
    }
}

impl<W: Write> CsvSink<W> {
    /// Wrap a writer; `write_header` controls whether the column names go first.
    pub fn new(
        writer: W,
        target: impl Into<String>,
        log_position_velocity: bool,
        write_header: bool,
    ) -> Result<Self> {
        let mut sink = Self {
            writer: csv::WriterBuilder::new().has_headers(false).from_writer(writer),
            target: target.into(),
            log_position_velocity,
            rows_written: 0,
        };
        if write_header {
            let headers = Self::headers(log_position_velocity);
            sink.writer.write_record(&headers).map_err(|e| sink.error("header", e))?;
        }
        Ok(sink)
    }

    /// Column names, in row order.
    pub fn headers(log_position_velocity: bool) -> Vec<&'static str> {
        let mut headers = MEASUREMENT_COLUMNS.to_vec();
        if log_position_velocity {
            headers.extend_from_slice(&POSITION_VELOCITY_COLUMNS);
        }
        headers
    }

    /// Data rows written through this sink (the header is not counted).
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    /// Flush and hand back the underlying writer.
    pub fn into_inner(self) -> Result<W> {
        let target = self.target;
        self.writer.into_inner().map_err(|e| {
            XbusError::sink(target, "flush on close", Box::new(e.into_error()))
        })
    }

    fn row(&self, record: &MeasurementRecord) -> Vec<String> {
        let mut row = Vec::with_capacity(Self::headers(self.log_position_velocity).len());
        row.push(cell(record.packet_counter()));
        row.push(cell(record.sample_time_fine()));
        row.push(record.utc_time().map(format_utc).unwrap_or_default());
        cells(&mut row, record.euler().map(|e| e.as_array()));
        cells(&mut row, record.quaternion());
        cells(&mut row, record.rate_of_turn_degrees());
        cells(&mut row, record.acceleration());
        cells(&mut row, record.magnetic_field());
        cells(&mut row, record.delta_v());
        cells(&mut row, record.delta_q());
        cells(&mut row, record.free_acceleration());
        row.push(cell(record.baro_pressure()));
        row.push(cell(record.temperature()));
        row.push(cell(record.status_word().map(|word| word.0)));

        if self.log_position_velocity {
            cells(&mut row, record.lat_lon());
            row.push(cell(record.altitude()));
            cells(&mut row, record.velocity());
        }
        row
    }

    fn error(&self, reason: &str, source: csv::Error) -> XbusError {
        XbusError::sink(self.target.clone(), reason, Box::new(source))
    }
}

impl<W: Write + Send> RecordSink for CsvSink<W> {
    fn write_record(&mut self, record: &MeasurementRecord) -> Result<()> {
        let row = self.row(record);
        self.writer.write_record(&row).map_err(|e| self.error("write row", e))?;
        self.rows_written += 1;
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        debug!("Flushing {} after {} row(s)", self.target, self.rows_written);
        self.writer
            .flush()
            .map_err(|e| XbusError::sink(self.target.clone(), "flush", Box::new(e)))
    }
}

fn cell<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn cells<const N: usize>(row: &mut Vec<String>, values: Option<[f64; N]>) {
    match values {
        Some(values) => row.extend(values.iter().map(f64::to_string)),
        None => row.extend(std::iter::repeat_n(String::new(), N)),
    }
}

fn format_utc(utc: UtcTime) -> String {
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:09}Z",
        utc.year, utc.month, utc.day, utc.hour, utc.minute, utc.second, utc.nanos
    )
}
