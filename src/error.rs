//! Error types for Xbus stream processing.
//!
//! Every anomaly the decoder can observe is a variant of [`XbusError`]. Most of them are
//! frame-scoped: they describe something wrong with one frame (or one stretch of discarded
//! bytes) and never affect how the next frame is interpreted.
//!
//! ## Error Categories
//!
//! - **Framing**: bytes discarded while searching for a frame marker
//! - **Integrity**: checksum mismatches and unsupported length encodings
//! - **Payload**: truncated, malformed or unknown TLV records
//! - **Runtime**: transport, file and configuration failures
//!
//! ## Severity
//!
//! ```rust
//! use xbus::{Severity, XbusError};
//!
//! let error = XbusError::unknown_field(0x9999, 2);
//! assert_eq!(error.severity(), Severity::Warning);
//! assert!(error.is_frame_scoped());
//!
//! let error = XbusError::checksum(0x12, 0x34);
//! assert_eq!(error.severity(), Severity::FrameDropped);
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for Xbus operations.
pub type Result<T, E = XbusError> = std::result::Result<T, E>;

/// How far the consequences of an error reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Informational; decoding continued unaffected.
    Warning,
    /// The current frame (or its remaining payload) was discarded.
    FrameDropped,
    /// The operation could not continue.
    Fatal,
}

/// Main error type for Xbus operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum XbusError {
    #[error("Stream not synchronized: discarded {discarded} byte(s) before frame marker")]
    Framing { discarded: usize },

    #[error("Checksum mismatch: computed {expected:#04x}, frame carries {found:#04x}")]
    Checksum { expected: u8, found: u8 },

    #[error(
        "Truncated record {data_id:#06x} at offset {offset}: declared {declared} byte(s), {remaining} remaining"
    )]
    TruncatedRecord { data_id: u16, offset: usize, declared: usize, remaining: usize },

    #[error("Extended payload length is not supported (message {message_id:#04x})")]
    UnsupportedLength { message_id: u8 },

    #[error("Unknown data identifier {data_id:#06x} ({len} byte(s) skipped)")]
    UnknownField { data_id: u16, len: usize },

    #[error("Record {data_id:#06x} too short: need {expected} byte(s), got {actual}")]
    FieldLength { data_id: u16, expected: usize, actual: usize },

    #[error("Record {data_id:#06x} holds an invalid value: {details}")]
    InvalidField { data_id: u16, details: String },

    #[error("Unexpected message id {found:#04x}, expected {expected:#04x}")]
    UnexpectedMessage { expected: u8, found: u8 },

    #[error("Transport failure on {link}: {reason}")]
    Transport {
        link: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Capture file error: {path}")]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("Record sink failure on {target}: {reason}")]
    Sink {
        target: String,
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid configuration: {reason}")]
    Config {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl XbusError {
    /// Classify how much data was lost because of this error.
    pub fn severity(&self) -> Severity {
        match self {
            XbusError::UnknownField { .. }
            | XbusError::FieldLength { .. }
            | XbusError::InvalidField { .. }
            | XbusError::Framing { .. } => Severity::Warning,
            XbusError::Checksum { .. }
            | XbusError::TruncatedRecord { .. }
            | XbusError::UnsupportedLength { .. }
            | XbusError::UnexpectedMessage { .. } => Severity::FrameDropped,
            XbusError::Transport { .. }
            | XbusError::File { .. }
            | XbusError::Io(_)
            | XbusError::Sink { .. }
            | XbusError::Config { .. } => Severity::Fatal,
        }
    }

    /// Returns whether the error is confined to a single frame of the stream.
    pub fn is_frame_scoped(&self) -> bool {
        !matches!(self.severity(), Severity::Fatal)
    }

    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            XbusError::Transport { .. } => true,
            XbusError::Io(err) => matches!(
                err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),
            _ => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            XbusError::Framing { .. } => vec![
                "Expected right after opening a link; no action needed",
                "If persistent, verify the baud rate matches the device",
            ],
            XbusError::Checksum { .. } => vec![
                "Check cabling and baud rate for line noise",
                "Lower the output rate if the link is saturated",
            ],
            XbusError::TruncatedRecord { .. } | XbusError::FieldLength { .. } => vec![
                "Verify the device firmware output format",
                "Capture the raw stream and inspect the offending frame",
            ],
            XbusError::UnsupportedLength { .. } => vec![
                "Reduce the output configuration so payloads stay below 255 bytes",
            ],
            XbusError::UnknownField { .. } => vec![
                "Remove unused outputs from the device configuration",
                "Add a decoding strategy for the identifier if it is needed",
            ],
            XbusError::InvalidField { .. } => vec![
                "Wait for the device to acquire a valid time reference",
            ],
            XbusError::UnexpectedMessage { .. } => vec![
                "Switch the device to measurement mode",
            ],
            XbusError::Transport { .. } | XbusError::Io(_) => vec![
                "Check the device is connected and powered",
                "Verify the port is not held by another process",
                "Reopen the link",
            ],
            XbusError::File { .. } => vec![
                "Check the capture file exists and is readable",
            ],
            XbusError::Sink { .. } => vec![
                "Check the output directory is writable and the disk is not full",
            ],
            XbusError::Config { .. } => vec![
                "Check the configuration file against the documented fields",
            ],
        }
    }

    /// Helper constructor for framing (resync) events.
    pub fn framing(discarded: usize) -> Self {
        XbusError::Framing { discarded }
    }

    /// Helper constructor for checksum mismatches.
    pub fn checksum(expected: u8, found: u8) -> Self {
        XbusError::Checksum { expected, found }
    }

    /// Helper constructor for unknown data identifiers.
    pub fn unknown_field(data_id: u16, len: usize) -> Self {
        XbusError::UnknownField { data_id, len }
    }

    /// Helper constructor for transport errors.
    pub fn transport(link: impl Into<String>, reason: impl Into<String>) -> Self {
        XbusError::Transport { link: link.into(), reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(
        link: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        XbusError::Transport { link: link.into(), reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for capture file errors with path context.
    pub fn file_error(path: PathBuf, source: std::io::Error) -> Self {
        XbusError::File { path, source }
    }

    /// Helper constructor for record sink errors with source.
    pub fn sink(
        target: impl Into<String>,
        reason: impl Into<String>,
        source: Box<dyn std::error::Error + Send + Sync>,
    ) -> Self {
        XbusError::Sink { target: target.into(), reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        XbusError::Config { reason: reason.into(), source: None }
    }
}

impl From<serde_yaml_ng::Error> for XbusError {
    fn from(err: serde_yaml_ng::Error) -> Self {
        XbusError::Config { reason: err.to_string(), source: Some(Box::new(err)) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn error_messages_carry_their_context(
                data_id in any::<u16>(),
                len in 0usize..256,
                expected in any::<u8>(),
                found in any::<u8>(),
                link in "[a-z/]{1,16}",
                reason in ".*"
            ) {
                let unknown = XbusError::unknown_field(data_id, len).to_string();
                let id_hex = format!("{:#06x}", data_id);
                prop_assert!(unknown.contains(&id_hex));
                prop_assert!(unknown.contains(&len.to_string()));

                let checksum = XbusError::checksum(expected, found).to_string();
                let expected_hex = format!("{:#04x}", expected);
                prop_assert!(checksum.contains(&expected_hex));

                let transport = XbusError::transport(link.clone(), reason.clone()).to_string();
                prop_assert!(transport.contains(&link));
                prop_assert!(transport.contains(&reason));
            }

            #[test]
            fn payload_errors_never_escape_the_frame(
                data_id in any::<u16>(),
                offset in 0usize..255,
                declared in 0usize..255,
                remaining in 0usize..255
            ) {
                let errors = [
                    XbusError::TruncatedRecord { data_id, offset, declared, remaining },
                    XbusError::unknown_field(data_id, declared),
                    XbusError::FieldLength { data_id, expected: declared, actual: remaining },
                    XbusError::framing(offset),
                ];
                for error in &errors {
                    prop_assert!(error.is_frame_scoped());
                    prop_assert!(!error.is_retryable());
                }
            }
        }
    }

    #[test]
    fn severity_classification() {
        assert_eq!(XbusError::framing(3).severity(), Severity::Warning);
        assert_eq!(XbusError::checksum(1, 2).severity(), Severity::FrameDropped);
        assert_eq!(
            XbusError::UnsupportedLength { message_id: 0x36 }.severity(),
            Severity::FrameDropped
        );
        assert_eq!(XbusError::transport("ttyUSB0", "gone").severity(), Severity::Fatal);
        assert!(Severity::Warning < Severity::FrameDropped);
        assert!(Severity::FrameDropped < Severity::Fatal);
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<XbusError>();

        let error = XbusError::transport("link", "test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn recovery_suggestions_are_provided() {
        let errors = [
            XbusError::framing(1),
            XbusError::checksum(0, 1),
            XbusError::unknown_field(0x9999, 2),
            XbusError::config("bad"),
            XbusError::transport("link", "closed"),
        ];
        for error in &errors {
            let suggestions = error.recovery_suggestions();
            assert!(!suggestions.is_empty());
            assert!(suggestions.iter().all(|s| s.len() > 5));
        }
    }

    #[test]
    fn retry_classification() {
        assert!(XbusError::transport("link", "reset").is_retryable());
        assert!(XbusError::Io(std::io::Error::from(std::io::ErrorKind::TimedOut)).is_retryable());
        assert!(!XbusError::Io(std::io::Error::from(std::io::ErrorKind::NotFound)).is_retryable());
        assert!(!XbusError::checksum(0, 1).is_retryable());
    }

    #[test]
    fn from_conversions_work() {
        let io_err = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "eof");
        let converted: XbusError = io_err.into();
        assert!(matches!(converted, XbusError::Io(_)));

        let yaml_err = serde_yaml_ng::from_str::<u32>("not: [a number").unwrap_err();
        let converted: XbusError = yaml_err.into();
        assert!(matches!(converted, XbusError::Config { source: Some(_), .. }));
    }

    #[test]
    fn source_chain_is_preserved() {
        let inner = std::io::Error::other("port vanished");
        let error = XbusError::transport_with_source("ttyUSB0", "read failed", Box::new(inner));
        let source = std::error::Error::source(&error).expect("source should be chained");
        assert!(source.to_string().contains("port vanished"));
    }
}
