//! Xbus wire protocol.
//!
//! Byte-level pieces of the decoding pipeline, each usable on its own:
//!
//! - [`FrameReconstructor`] turns arbitrarily chunked bytes into checksum-valid [`Frame`]s
//! - [`checksum`] computes and validates the trailing frame checksum
//! - [`TlvRecords`] walks the tag-length-value records of an MTData2 payload
//! - [`FieldDecoder`] turns those records into a [`MeasurementRecord`]
//! - [`fixed_point`] and [`orientation`] hold the numeric conversions
//! - [`command`] builds frames to send to the device
//!
//! [`Frame`]: crate::types::Frame
//! [`MeasurementRecord`]: crate::types::MeasurementRecord

pub mod checksum;
pub mod command;
mod decoder;
pub mod fixed_point;
pub mod orientation;
mod reconstructor;
mod tlv;

pub use decoder::{DecodeReport, FIELD_TABLE, FieldDecoder, FieldKind};
pub use fixed_point::Fp1632;
pub use orientation::{EulerAngles, quaternion_to_euler};
pub use reconstructor::{FrameReconstructor, ReconstructorStats};
pub use tlv::{TLV_HEADER_LEN, TlvRecord, TlvRecords, TlvWriter};
