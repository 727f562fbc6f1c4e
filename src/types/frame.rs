//! Xbus frame type

use std::fmt;
use std::sync::Arc;

use super::xbus_ids::{frame as layout, message};
use crate::protocol::checksum;
use crate::{Result, XbusError};

/// One complete Xbus frame: `[0xFA][bus id][message id][length][payload][checksum]`.
///
/// The raw bytes are shared via `Arc`, so frames are cheap to clone and can be handed
/// to another task without copying.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: Arc<[u8]>,
}

impl Frame {
    /// Wrap bytes the reconstructor has already sliced and validated.
    pub(crate) fn from_validated(bytes: Vec<u8>) -> Self {
        debug_assert!(bytes.len() >= layout::OVERHEAD);
        debug_assert_eq!(bytes.len(), bytes[layout::LENGTH_OFFSET] as usize + layout::OVERHEAD);
        Self { bytes: bytes.into() }
    }

    /// Build an outgoing frame addressed to the master bus id, appending length and checksum.
    pub fn build(message_id: u8, payload: &[u8]) -> Result<Self> {
        if payload.len() > layout::MAX_PAYLOAD_LEN {
            return Err(XbusError::UnsupportedLength { message_id });
        }

        let mut bytes = Vec::with_capacity(payload.len() + layout::OVERHEAD);
        bytes.extend_from_slice(&[layout::PREAMBLE, layout::BUS_ID, message_id, payload.len() as u8]);
        bytes.extend_from_slice(payload);
        bytes.push(checksum::compute(&bytes));

        Ok(Self { bytes: bytes.into() })
    }

    /// Build an MTData2 measurement frame around a TLV payload.
    pub fn mt_data2(payload: &[u8]) -> Result<Self> {
        Self::build(message::MT_DATA2, payload)
    }

    /// Bus identifier (second byte).
    pub fn bus_id(&self) -> u8 {
        self.bytes[1]
    }

    /// Message identifier (third byte).
    pub fn message_id(&self) -> u8 {
        self.bytes[2]
    }

    /// Whether this frame carries MTData2 measurements.
    pub fn is_mt_data2(&self) -> bool {
        self.message_id() == message::MT_DATA2
    }

    /// Payload bytes between the length field and the checksum.
    pub fn payload(&self) -> &[u8] {
        &self.bytes[layout::HEADER_LEN..self.bytes.len() - 1]
    }

    /// Trailing checksum byte.
    pub fn checksum(&self) -> u8 {
        self.bytes[self.bytes.len() - 1]
    }

    /// Full frame including header and checksum.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Total frame length in bytes, header and checksum included.
    pub fn frame_len(&self) -> usize {
        self.bytes.len()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Frame")
            .field("message_id", &format_args!("{:#04x}", self.message_id()))
            .field("payload_len", &self.payload().len())
            .field("checksum", &format_args!("{:#04x}", self.checksum()))
            .finish()
    }
}
