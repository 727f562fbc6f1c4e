//! Core types for Xbus measurement data.
//!
//! ## Architecture
//!
//! - [`Frame`] is one checksum-valid Xbus frame, shared via `Arc`
//! - [`MeasurementRecord`] holds the decoded fields of one MTData2 frame; every field is
//!   optional and [`Field`] names them for availability queries
//! - [`FieldValue`] reads fixed-size big-endian values out of record payloads
//! - [`StatusWord`] wraps the device status bitfield, [`decode_status`] classifies it
//! - [`xbus_ids`] collects the protocol constants
//!
//! ## Usage Example
//!
//! ```rust
//! use xbus::types::{FieldValue, StatusWord, read_field};
//!
//! let value = [0x00, 0x00, 0x00, 0x06];
//! let word = StatusWord(read_field::<u32>(0xE020, &value).unwrap());
//!
//! let status = word.classify();
//! assert!(status.filter_valid);
//! assert!(status.gnss_fix);
//! assert_eq!(u32::SIZE, 4);
//! ```

mod field_value;
mod frame;
mod record;
mod status;
mod update_rate;
pub mod xbus_ids;

pub use field_value::{FieldValue, read_field};
pub use frame::Frame;
pub use record::{Field, MeasurementRecord, UtcTime};
pub use status::{
    FilterMode, NoRotationState, RtkStatus, StatusClassification, StatusWord, decode_status,
};
pub use update_rate::UpdateRate;
