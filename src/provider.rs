//! Transport seams: byte sources and command sinks

use bytes::Bytes;

use crate::Result;
use crate::types::{Frame, MeasurementRecord};

/// Source of raw Xbus bytes
///
/// Providers abstract over serial ports, sockets and capture files. They hand out
/// chunks exactly as they arrive; chunk boundaries carry no meaning and frames may be
/// split across any number of chunks.
#[async_trait::async_trait]
pub trait Provider: Send + 'static {
    /// Get the next chunk of bytes
    ///
    /// Returns:
    /// - `Ok(Some(chunk))` - New bytes available (never empty)
    /// - `Ok(None)` - Stream ended (normal termination)
    /// - `Err(e)` - Transport error; the driver may retry
    ///
    /// Each provider handles timing internally:
    /// - Reader: waits on the underlying I/O
    /// - Replay: paces chunks to the configured speed
    async fn next_chunk(&mut self) -> Result<Option<Bytes>>;

    /// Human-readable link description for logs and errors
    fn link_name(&self) -> &str;
}

/// Destination for outgoing command frames
#[async_trait::async_trait]
pub trait CommandSink: Send {
    /// Write one complete frame
    async fn send(&mut self, frame: &Frame) -> Result<()>;
}

/// Destination for decoded records (CSV logs, databases, ...)
///
/// Sinks are synchronous: they are driven from the consumer side of a record stream,
/// never from the decode task.
pub trait RecordSink: Send {
    /// Persist one record; fields the record does not carry are written as empty
    fn write_record(&mut self, record: &MeasurementRecord) -> Result<()>;

    /// Push buffered output to the underlying storage
    fn flush(&mut self) -> Result<()>;
}
