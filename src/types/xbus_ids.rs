//! Constants for the Xbus wire format and MTData2 identifiers
//!
//! Frame layout: `[0xFA][0xFF][message id][length][payload][checksum]`.

// Frame header bytes
pub mod frame {
    pub const PREAMBLE: u8 = 0xFA;
    pub const BUS_ID: u8 = 0xFF; // master device
    pub const HEADER_LEN: usize = 4; // preamble, bus id, message id, length
    pub const OVERHEAD: usize = 5; // header + trailing checksum
    pub const LENGTH_OFFSET: usize = 3;
    pub const EXTENDED_LENGTH: u8 = 0xFF; // followed by a 2-byte length, unsupported
    pub const MAX_PAYLOAD_LEN: usize = 254;
}

// Message identifiers
pub mod message {
    pub const GO_TO_MEASUREMENT: u8 = 0x10;
    pub const GO_TO_CONFIG: u8 = 0x30;
    pub const MT_DATA2: u8 = 0x36;
    pub const SET_OUTPUT_CONFIGURATION: u8 = 0xC0;
}

// MTData2 data identifiers (big-endian on the wire)
pub mod data_id {
    pub const TEMPERATURE: u16 = 0x0810;
    pub const UTC_TIME: u16 = 0x1010;
    pub const PACKET_COUNTER: u16 = 0x1020;
    pub const SAMPLE_TIME_FINE: u16 = 0x1060;
    pub const QUATERNION: u16 = 0x2010;
    pub const EULER_ANGLES: u16 = 0x2030;
    pub const BARO_PRESSURE: u16 = 0x3010;
    pub const DELTA_V: u16 = 0x4010;
    pub const ACCELERATION: u16 = 0x4020;
    pub const FREE_ACCELERATION: u16 = 0x4030;
    pub const ALTITUDE_ELLIPSOID: u16 = 0x5022;
    pub const LAT_LON: u16 = 0x5042;
    pub const RATE_OF_TURN: u16 = 0x8020;
    pub const DELTA_Q: u16 = 0x8030;
    pub const MAGNETIC_FIELD: u16 = 0xC020;
    pub const VELOCITY_XYZ: u16 = 0xD012;
    pub const STATUS_WORD: u16 = 0xE020;
}

// Status word bit ranges
pub mod status {
    pub const FILTER_VALID: u32 = 1 << 1;
    pub const GNSS_FIX: u32 = 1 << 2;

    pub const NO_ROTATION_MASK: u32 = 0x0000_0018; // bits 3-4
    pub const NO_ROTATION_ABORTED: u32 = 0x0000_0010;
    pub const NO_ROTATION_RUNNING: u32 = 0x0000_0018;

    pub const SYNC_IN_MARKER: u32 = 1 << 21;
    pub const SYNC_OUT_MARKER: u32 = 1 << 22;

    pub const FILTER_MODE_MASK: u32 = 0x0380_0000; // bits 23-25
    pub const FILTER_MODE_COASTING: u32 = 0x0080_0000;
    pub const FILTER_MODE_WITH_GNSS: u32 = 0x0180_0000;

    pub const GNSS_TIME_PULSE: u32 = 1 << 26;

    pub const RTK_MASK: u32 = 0x1800_0000; // bits 27-28
    pub const RTK_FLOATING: u32 = 0x0800_0000;
    pub const RTK_FIXED: u32 = 0x1000_0000;
}
