//! Outgoing command frames
//!
//! Only frame construction lives here; acknowledgements from the device are not
//! interpreted.

use crate::protocol::checksum;
use crate::types::Frame;
use crate::types::xbus_ids::{frame as layout, message};
use crate::{Result, XbusError};

/// Switch the device to configuration mode.
pub fn go_to_config() -> Frame {
    empty_command(message::GO_TO_CONFIG)
}

/// Switch the device to measurement mode.
pub fn go_to_measurement() -> Frame {
    empty_command(message::GO_TO_MEASUREMENT)
}

fn empty_command(message_id: u8) -> Frame {
    let mut bytes = vec![layout::PREAMBLE, layout::BUS_ID, message_id, 0];
    bytes.push(checksum::compute(&bytes));
    Frame::from_validated(bytes)
}

/// Builder for the SetOutputConfiguration (`0xC0`) message.
///
/// Each entry is a data identifier and an output rate in Hz, both big-endian `u16`.
///
/// ```rust
/// use xbus::types::xbus_ids::data_id;
/// use xbus::protocol::command::OutputConfiguration;
///
/// let frame = OutputConfiguration::new()
///     .with(data_id::PACKET_COUNTER, OutputConfiguration::MAX_RATE)
///     .with(data_id::QUATERNION, 400)
///     .to_frame()
///     .unwrap();
/// assert_eq!(frame.message_id(), 0xC0);
/// assert_eq!(frame.payload(), &[0x10, 0x20, 0xFF, 0xFF, 0x20, 0x10, 0x01, 0x90]);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutputConfiguration {
    entries: Vec<(u16, u16)>,
}

impl OutputConfiguration {
    /// Rate value asking the device to output on every sample.
    pub const MAX_RATE: u16 = 0xFFFF;
    /// Entries that fit in a single non-extended frame.
    pub const MAX_ENTRIES: usize = 63;

    pub fn new() -> Self {
        Self::default()
    }

    /// Add an output at `rate_hz`.
    pub fn with(mut self, data_id: u16, rate_hz: u16) -> Self {
        self.entries.push((data_id, rate_hz));
        self
    }

    pub fn entries(&self) -> &[(u16, u16)] {
        &self.entries
    }

    pub fn payload(&self) -> Vec<u8> {
        self.entries
            .iter()
            .flat_map(|(id, rate)| {
                let [a, b] = id.to_be_bytes();
                let [c, d] = rate.to_be_bytes();
                [a, b, c, d]
            })
            .collect()
    }

    /// Build the frame to send.
    pub fn to_frame(&self) -> Result<Frame> {
        if self.entries.len() > Self::MAX_ENTRIES {
            return Err(XbusError::UnsupportedLength { message_id: message::SET_OUTPUT_CONFIGURATION });
        }
        Frame::build(message::SET_OUTPUT_CONFIGURATION, &self.payload())
    }
}
