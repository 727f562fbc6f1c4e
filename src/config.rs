//! Runtime configuration
//!
//! Every field has a default, so a YAML file only needs the keys it changes:
//!
//! ```rust
//! use xbus::XbusConfig;
//!
//! let config = XbusConfig::from_yaml_str("nominal_rate_hz: 100\nreplay_speed: 4.0\n").unwrap();
//! assert_eq!(config.nominal_rate_hz, 100.0);
//! assert_eq!(config.read_chunk_size, XbusConfig::default().read_chunk_size);
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

use crate::types::xbus_ids::message;
use crate::{Result, XbusError};

/// Settings for transports, the driver task and replay pacing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XbusConfig {
    /// Bytes requested per read from a byte-stream transport.
    pub read_chunk_size: usize,
    /// Capacity of the in-order record channel.
    pub record_channel_capacity: usize,
    /// Device output rate, used to normalise subscription rates and pace replays.
    pub nominal_rate_hz: f64,
    /// Consecutive transport errors tolerated before the driver stops.
    pub max_consecutive_errors: u32,
    /// Bytes delivered per replay tick.
    pub replay_chunk_size: usize,
    /// Replay speed multiplier; `0` replays as fast as possible.
    pub replay_speed: f64,
    /// Message ids passed to the field decoder; other frames are counted and skipped.
    pub decode_message_ids: Vec<u8>,
}

impl Default for XbusConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 1024,
            record_channel_capacity: 1024,
            nominal_rate_hz: 400.0,
            max_consecutive_errors: 10,
            replay_chunk_size: 256,
            replay_speed: 1.0,
            decode_message_ids: vec![message::MT_DATA2],
        }
    }
}

impl XbusConfig {
    /// Parse and validate YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path)
            .map_err(|e| XbusError::file_error(path.to_path_buf(), e))?;
        let config = Self::from_yaml_str(&yaml)?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn to_yaml_string(&self) -> Result<String> {
        Ok(serde_yaml_ng::to_string(self)?)
    }

    /// Reject values the driver cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.read_chunk_size == 0 {
            return Err(XbusError::config("read_chunk_size must be greater than zero"));
        }
        if self.record_channel_capacity == 0 {
            return Err(XbusError::config("record_channel_capacity must be greater than zero"));
        }
        if !(self.nominal_rate_hz.is_finite() && self.nominal_rate_hz > 0.0) {
            return Err(XbusError::config(format!(
                "nominal_rate_hz must be positive, got {}",
                self.nominal_rate_hz
            )));
        }
        if self.max_consecutive_errors == 0 {
            return Err(XbusError::config("max_consecutive_errors must be at least 1"));
        }
        if self.replay_chunk_size == 0 {
            return Err(XbusError::config("replay_chunk_size must be greater than zero"));
        }
        if !(self.replay_speed.is_finite() && self.replay_speed >= 0.0) {
            return Err(XbusError::config(format!(
                "replay_speed must be zero or positive, got {}",
                self.replay_speed
            )));
        }
        if self.decode_message_ids.is_empty() {
            return Err(XbusError::config("decode_message_ids must not be empty"));
        }
        Ok(())
    }

    /// Whether frames with this message id should be decoded.
    pub fn decodes(&self, message_id: u8) -> bool {
        self.decode_message_ids.contains(&message_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = XbusConfig::default();
        config.validate().unwrap();
        assert!(config.decodes(0x36));
        assert!(!config.decodes(0x30));
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config = XbusConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, XbusConfig::default());
    }

    #[test]
    fn partial_yaml_overrides() {
        let yaml = "read_chunk_size: 64\nmax_consecutive_errors: 3\ndecode_message_ids: [0x36, 0x32]\n";
        let config = XbusConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.read_chunk_size, 64);
        assert_eq!(config.max_consecutive_errors, 3);
        assert_eq!(config.decode_message_ids, vec![0x36, 0x32]);
        assert_eq!(config.replay_speed, 1.0);
    }

    #[test]
    fn yaml_round_trip() {
        let config = XbusConfig { nominal_rate_hz: 100.0, ..Default::default() };
        let yaml = config.to_yaml_string().unwrap();
        assert_eq!(XbusConfig::from_yaml_str(&yaml).unwrap(), config);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let cases = [
            "read_chunk_size: 0",
            "record_channel_capacity: 0",
            "nominal_rate_hz: 0",
            "nominal_rate_hz: -5",
            "max_consecutive_errors: 0",
            "replay_chunk_size: 0",
            "replay_speed: -1",
            "decode_message_ids: []",
        ];
        for yaml in cases {
            let err = XbusConfig::from_yaml_str(yaml).unwrap_err();
            assert!(matches!(err, XbusError::Config { .. }), "{yaml}: {err:?}");
        }
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        let err = XbusConfig::from_yaml_str("read_chunk_size: [1, 2").unwrap_err();
        assert!(matches!(err, XbusError::Config { source: Some(_), .. }));
    }

    #[test]
    fn missing_file_reports_path() {
        let err = XbusConfig::load("/nonexistent/xbus.yaml").unwrap_err();
        match err {
            XbusError::File { path, .. } => assert_eq!(path, Path::new("/nonexistent/xbus.yaml")),
            other => panic!("Expected File error, got {other:?}"),
        }
    }
}
