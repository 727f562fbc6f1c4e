//! Status word bitfield and its structured classification

use serde::{Deserialize, Serialize};
use std::fmt;

use super::xbus_ids::status as bits;

/// Raw 32-bit status word reported under data identifier `0xE020`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusWord(pub u32);

impl StatusWord {
    /// Create a new StatusWord from a u32 value.
    pub fn new(value: u32) -> Self {
        Self(value)
    }

    /// Check if a specific bit is set.
    pub fn is_set(&self, bit: u32) -> bool {
        bit < 32 && (self.0 & (1 << bit)) != 0
    }

    /// Check if any bit of a mask is set.
    pub fn has_flag(&self, flag: u32) -> bool {
        (self.0 & flag) != 0
    }

    /// Get the raw u32 value.
    pub fn value(&self) -> u32 {
        self.0
    }

    /// Decode into a structured classification.
    pub fn classify(self) -> StatusClassification {
        decode_status(self)
    }
}

/// Gyro-bias estimation while stationary (bits 3-4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoRotationState {
    NotRunning,
    Aborted,
    Running,
    Unknown(u32),
}

/// Sensor fusion filter mode (bits 23-25).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterMode {
    WithoutGnss,
    Coasting,
    WithGnss,
    Unknown(u32),
}

/// RTK correction status (bits 27-28).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RtkStatus {
    None,
    Floating,
    Fixed,
    Unknown(u32),
}

/// Structured view of a [`StatusWord`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusClassification {
    pub filter_valid: bool,
    pub gnss_fix: bool,
    pub no_rotation: NoRotationState,
    pub sync_in: bool,
    pub sync_out: bool,
    pub filter_mode: FilterMode,
    pub gnss_time_pulse: bool,
    pub rtk: RtkStatus,
}

/// Decode the fixed bit ranges of a status word.
pub fn decode_status(word: StatusWord) -> StatusClassification {
    let raw = word.value();

    let no_rotation = match raw & bits::NO_ROTATION_MASK {
        0 => NoRotationState::NotRunning,
        bits::NO_ROTATION_ABORTED => NoRotationState::Aborted,
        bits::NO_ROTATION_RUNNING => NoRotationState::Running,
        other => NoRotationState::Unknown(other),
    };

    let filter_mode = match raw & bits::FILTER_MODE_MASK {
        0 => FilterMode::WithoutGnss,
        bits::FILTER_MODE_COASTING => FilterMode::Coasting,
        bits::FILTER_MODE_WITH_GNSS => FilterMode::WithGnss,
        other => FilterMode::Unknown(other),
    };

    let rtk = match raw & bits::RTK_MASK {
        0 => RtkStatus::None,
        bits::RTK_FLOATING => RtkStatus::Floating,
        bits::RTK_FIXED => RtkStatus::Fixed,
        other => RtkStatus::Unknown(other),
    };

    StatusClassification {
        filter_valid: word.has_flag(bits::FILTER_VALID),
        gnss_fix: word.has_flag(bits::GNSS_FIX),
        no_rotation,
        sync_in: word.has_flag(bits::SYNC_IN_MARKER),
        sync_out: word.has_flag(bits::SYNC_OUT_MARKER),
        filter_mode,
        gnss_time_pulse: word.has_flag(bits::GNSS_TIME_PULSE),
        rtk,
    }
}

impl fmt::Display for StatusClassification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let yes_no = |flag: bool| if flag { "yes" } else { "no" };
        write!(
            f,
            "filter valid: {}, gnss fix: {}, no-rotation: {:?}, sync in: {}, sync out: {}, \
             filter mode: {:?}, time pulse: {}, rtk: {:?}",
            yes_no(self.filter_valid),
            yes_no(self.gnss_fix),
            self.no_rotation,
            yes_no(self.sync_in),
            yes_no(self.sync_out),
            self.filter_mode,
            yes_no(self.gnss_time_pulse),
            self.rtk
        )
    }
}
