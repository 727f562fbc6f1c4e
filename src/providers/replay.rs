//! Replay provider for captured byte streams

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tokio::time::{Duration, Interval, MissedTickBehavior, interval};
use tracing::{debug, info, trace};

use crate::provider::Provider;
use crate::{Result, XbusConfig, XbusError};

/// Replays a raw capture in fixed-size chunks
///
/// A capture is the byte stream exactly as read from the device, so it may start
/// mid-frame and contain noise. One chunk is released per tick; ticks run at the
/// nominal device rate multiplied by the replay speed.
pub struct ReplayProvider {
    /// Capture contents
    data: Bytes,

    /// Read position
    position: usize,

    chunk_size: usize,

    /// Chunk pacing; `None` replays as fast as possible
    interval: Option<Interval>,

    link: String,
}

impl ReplayProvider {
    /// Open a capture file
    pub async fn open<P: AsRef<Path>>(path: P, config: &XbusConfig) -> Result<Self> {
        let path = path.as_ref();
        let data = tokio::fs::read(path)
            .await
            .map_err(|e| XbusError::file_error(PathBuf::from(path), e))?;

        info!("Opened capture {}: {} bytes", path.display(), data.len());
        Ok(Self::from_bytes(data, path.display().to_string(), config))
    }

    /// Replay bytes already in memory
    pub fn from_bytes(data: impl Into<Bytes>, link: impl Into<String>, config: &XbusConfig) -> Self {
        let mut provider = Self {
            data: data.into(),
            position: 0,
            chunk_size: config.replay_chunk_size.max(1),
            interval: None,
            link: link.into(),
        };
        provider.set_speed(config.nominal_rate_hz, config.replay_speed);
        provider
    }

    /// Change pacing; a speed of zero disables it
    pub fn set_speed(&mut self, nominal_rate_hz: f64, speed: f64) {
        let ticks_per_second = nominal_rate_hz * speed;
        self.interval = if ticks_per_second > 0.0 && ticks_per_second.is_finite() {
            let mut ticker = interval(Duration::from_secs_f64(1.0 / ticks_per_second));
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            Some(ticker)
        } else {
            None
        };
        debug!("Replay speed set to {}x ({} chunks/s)", speed, ticks_per_second);
    }

    /// Fraction of the capture already delivered
    pub fn progress(&self) -> f64 {
        if self.data.is_empty() { 1.0 } else { self.position as f64 / self.data.len() as f64 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.position
    }
}

#[async_trait::async_trait]
impl Provider for ReplayProvider {
    async fn next_chunk(&mut self) -> Result<Option<Bytes>> {
        if self.position >= self.data.len() {
            debug!("Reached end of replay");
            return Ok(None);
        }

        if let Some(ticker) = self.interval.as_mut() {
            ticker.tick().await;
        }

        let end = (self.position + self.chunk_size).min(self.data.len());
        let chunk = self.data.slice(self.position..end);
        self.position = end;

        trace!("Replay chunk {}..{} of {}", end - chunk.len(), end, self.data.len());
        Ok(Some(chunk))
    }

    fn link_name(&self) -> &str {
        &self.link
    }
}
