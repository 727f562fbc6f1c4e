//! Decoding library for Xbus IMU/GNSS measurement streams.
//!
//! Inertial modules speaking the Xbus protocol emit a continuous byte stream of framed
//! messages. The measurement message (MTData2) carries a variable set of sensor
//! outputs encoded as tag-length-value records. This crate turns that stream back into
//! structured records, whatever way the transport happens to chunk it.
//!
//! # Features
//!
//! - **Chunking-independent framing**: frames are recovered identically from any split
//!   of the byte stream, with resynchronisation after noise
//! - **Best-effort decoding**: unknown or malformed records are reported and skipped,
//!   never fatal to the stream
//! - **Async runtime**: providers for any tokio reader or a capture file, in-order and
//!   latest-value record streams
//!
//! ## Example (synchronous decoding)
//!
//! ```rust
//! use xbus::{FieldDecoder, FrameReconstructor};
//!
//! # fn read_from_device() -> Vec<u8> { Vec::new() }
//! let mut reconstructor = FrameReconstructor::new();
//! let decoder = FieldDecoder::new();
//!
//! let chunk = read_from_device();
//! for frame in reconstructor.feed(&chunk) {
//!     if let Ok(report) = decoder.decode_frame(&frame) {
//!         println!("{:?}", report.record.euler());
//!     }
//! }
//! ```
//!
//! ## Example (capture replay)
//!
//! ```rust,no_run
//! use xbus::{UpdateRate, Xbus};
//! use futures::StreamExt;
//!
//! #[tokio::main]
//! async fn main() -> xbus::Result<()> {
//!     let connection = Xbus::open("capture.bin").await?;
//!     let mut stream = connection.subscribe(UpdateRate::Max(10));
//!
//!     while let Some(record) = stream.next().await {
//!         println!("{:?}", record.euler());
//!     }
//!     Ok(())
//! }
//! ```

// Core types and error handling
mod config;
mod error;
pub mod protocol;
#[cfg_attr(any(test, feature = "benchmark"), path = "test_utils.rs")]
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod types;

// Stream-based runtime
pub mod connection;
pub mod driver;
pub mod provider;
pub mod providers;
pub mod stream;

// Core exports
pub use config::XbusConfig;
pub use error::*;
pub use types::*;

// Protocol exports
pub use protocol::{
    DecodeReport, EulerAngles, FieldDecoder, FrameReconstructor, ReconstructorStats, TlvWriter,
};

// Runtime exports
pub use connection::XbusConnection;
pub use driver::{LinkState, LinkStats};
pub use provider::{CommandSink, Provider, RecordSink};
pub use providers::{CsvSink, ReaderProvider, ReplayProvider, WriterSink};

use std::path::Path;
use tokio::io::AsyncRead;

/// Unified entry point for Xbus connections.
///
/// # Examples
///
/// ## Serial port or socket
/// ```rust,no_run
/// use xbus::Xbus;
///
/// #[tokio::main]
/// async fn main() -> xbus::Result<()> {
///     let stream = tokio::net::TcpStream::connect("192.168.1.20:9000").await?;
///     let mut connection = Xbus::attach(stream);
///     let _records = connection.records();
///     Ok(())
/// }
/// ```
pub struct Xbus;

impl Xbus {
    /// Replay a raw capture file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns [`XbusError::File`] if the file cannot be read.
    pub async fn open<P: AsRef<Path>>(path: P) -> Result<XbusConnection> {
        Self::open_with_config(path, XbusConfig::default()).await
    }

    /// Replay a raw capture file.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the file cannot be read.
    pub async fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: XbusConfig,
    ) -> Result<XbusConnection> {
        config.validate()?;
        let provider = ReplayProvider::open(path, &config).await?;
        Ok(XbusConnection::start(provider, &config))
    }

    /// Decode a live byte stream (serial port, TCP socket, pipe) with the default
    /// configuration.
    ///
    /// Must be called from within a tokio runtime.
    pub fn attach<R>(reader: R) -> XbusConnection
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let config = XbusConfig::default();
        let provider = ReaderProvider::new(reader, "stream", config.read_chunk_size);
        XbusConnection::start(provider, &config)
    }

    /// Decode a live byte stream.
    ///
    /// # Errors
    ///
    /// Returns [`XbusError::Config`] if the configuration is invalid.
    pub fn attach_with_config<R>(
        reader: R,
        link: impl Into<String>,
        config: XbusConfig,
    ) -> Result<XbusConnection>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        config.validate()?;
        let provider = ReaderProvider::new(reader, link, config.read_chunk_size);
        Ok(XbusConnection::start(provider, &config))
    }
}
