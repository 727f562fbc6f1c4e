//! Provider over any tokio byte stream

use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::provider::{CommandSink, Provider};
use crate::types::Frame;
use crate::{Result, XbusError};

/// Reads chunks from a serial port, socket or any other [`AsyncRead`]
pub struct ReaderProvider<R> {
    reader: R,
    buf: BytesMut,
    chunk_size: usize,
    link: String,
    bytes_read: u64,
}

impl<R> ReaderProvider<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    pub fn new(reader: R, link: impl Into<String>, chunk_size: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            reader,
            buf: BytesMut::with_capacity(chunk_size),
            chunk_size,
            link: link.into(),
            bytes_read: 0,
        }
    }

    /// Total bytes read so far
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }
}

#[async_trait::async_trait]
impl<R> Provider for ReaderProvider<R>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        self.buf.reserve(self.chunk_size);
        let n = self
            .reader
            .read_buf(&mut self.buf)
            .await
            .map_err(|e| XbusError::transport_with_source(&self.link, "read failed", Box::new(e)))?;

        if n == 0 {
            debug!("{} reached end of stream after {} bytes", self.link, self.bytes_read);
            return Ok(None);
        }

        self.bytes_read += n as u64;
        trace!("{}: read {} bytes", self.link, n);
        Ok(Some(self.buf.split().freeze()))
    }

    fn link_name(&self) -> &str {
        &self.link
    }
}

/// Sends command frames over any [`AsyncWrite`]
pub struct WriterSink<W> {
    writer: W,
    link: String,
}

impl<W> WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    pub fn new(writer: W, link: impl Into<String>) -> Self {
        Self { writer, link: link.into() }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait::async_trait]
impl<W> CommandSink for WriterSink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    async fn send(&mut self, frame: &Frame) -> Result<()> {
        let link = &self.link;
        self.writer
            .write_all(frame.as_bytes())
            .await
            .map_err(|e| XbusError::transport_with_source(link, "write failed", Box::new(e)))?;
        self.writer
            .flush()
            .await
            .map_err(|e| XbusError::transport_with_source(link, "flush failed", Box::new(e)))?;
        debug!("{}: sent message {:#04x} ({} bytes)", link, frame.message_id(), frame.frame_len());
        Ok(())
    }
}
