//! Driver spawns and manages the stream decoding task

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::XbusConfig;
use crate::protocol::{FieldDecoder, FrameReconstructor, ReconstructorStats};
use crate::provider::Provider;
use crate::types::MeasurementRecord;

/// Lifecycle of the decoding task
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkState {
    #[default]
    Running,
    /// Provider reported end of stream
    Ended,
    /// Stopped after too many consecutive transport errors
    Failed,
    /// Stopped by cancellation
    Cancelled,
}

/// Counters for one link, published after every chunk
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkStats {
    pub link: String,
    pub state: LinkState,
    pub chunks_received: u64,
    pub bytes_received: u64,
    pub framing: ReconstructorStats,
    /// Framing anomalies drained from the reconstructor (resyncs, checksum failures,
    /// extended lengths)
    pub framing_events: u64,
    /// Description of the most recent framing anomaly
    pub last_framing_event: Option<String>,
    pub records_decoded: u64,
    /// Frames whose message id is not configured for decoding
    pub frames_skipped: u64,
    pub decode_warnings: u64,
    /// Payloads abandoned part-way (the partial record is still delivered)
    pub decode_errors: u64,
    /// Records the in-order channel could not take because the consumer lagged
    pub records_dropped: u64,
    pub transport_errors: u64,
}

/// Result of spawning the driver task
pub struct DriverChannels {
    /// Every decoded record, in arrival order
    pub records: mpsc::Receiver<Arc<MeasurementRecord>>,
    /// Most recent record
    pub latest: watch::Receiver<Option<Arc<MeasurementRecord>>>,
    /// Link counters
    pub stats: watch::Receiver<LinkStats>,
    /// Cancellation token for graceful shutdown
    pub cancel: CancellationToken,
}

/// Driver spawns and manages the decoding task
///
/// One task owns the provider, the frame reconstructor and the field decoder, so
/// records are produced strictly in the order their bytes arrived.
pub struct Driver;

impl Driver {
    /// Spawn the decoding task for the given provider
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<P>(provider: P, config: &XbusConfig) -> DriverChannels
    where
        P: Provider,
    {
        let (records_tx, records_rx) = mpsc::channel(config.record_channel_capacity.max(1));
        let (latest_tx, latest_rx) = watch::channel(None);
        let (stats_tx, stats_rx) = watch::channel(LinkStats {
            link: provider.link_name().to_string(),
            ..Default::default()
        });

        let cancel = CancellationToken::new();
        let task = DecodeTask {
            config: config.clone(),
            reconstructor: FrameReconstructor::new(),
            decoder: FieldDecoder::new(),
            records_tx: Some(records_tx),
            latest_tx,
            stats_tx,
        };

        let cancel_task = cancel.clone();
        tokio::spawn(async move {
            task.run(provider, cancel_task).await;
        });

        DriverChannels { records: records_rx, latest: latest_rx, stats: stats_rx, cancel }
    }
}

struct DecodeTask {
    config: XbusConfig,
    reconstructor: FrameReconstructor,
    decoder: FieldDecoder,
    /// Dropped once the consumer closes its end
    records_tx: Option<mpsc::Sender<Arc<MeasurementRecord>>>,
    latest_tx: watch::Sender<Option<Arc<MeasurementRecord>>>,
    stats_tx: watch::Sender<LinkStats>,
}

impl DecodeTask {
    async fn run<P: Provider>(mut self, mut provider: P, cancel: CancellationToken) {
        let link = provider.link_name().to_string();
        info!("Decode task started on {}", link);
        let max_errors = self.config.max_consecutive_errors.max(1);
        let mut error_count = 0u32;

        let final_state = loop {
            // Use select to allow cancellation during provider.next_chunk()
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    info!("Decode task on {} cancelled", link);
                    break LinkState::Cancelled;
                }
                result = provider.next_chunk() => result,
            };

            match result {
                Ok(Some(chunk)) => {
                    error_count = 0;
                    self.process_chunk(&chunk);
                }
                Ok(None) => {
                    info!("{} ended", link);
                    break LinkState::Ended;
                }
                Err(e) => {
                    error_count += 1;
                    self.stats_tx.send_modify(|stats| stats.transport_errors += 1);
                    error!("Provider error on {} ({}/{}): {}", link, error_count, max_errors, e);

                    if error_count >= max_errors {
                        error!("Too many provider errors on {}, shutting down", link);
                        break LinkState::Failed;
                    }

                    // Exponential backoff: 50ms, 100ms, 200ms, ...
                    let backoff = Duration::from_millis(50 * (1 << error_count.min(5)));
                    tokio::select! {
                        _ = cancel.cancelled() => break LinkState::Cancelled,
                        _ = tokio::time::sleep(backoff) => {}
                    }
                }
            }
        };

        let framing = self.reconstructor.stats();
        self.stats_tx.send_modify(|stats| {
            stats.state = final_state;
            stats.framing = framing;
        });
        let stats = self.stats_tx.borrow().clone();
        info!(
            "Decode task on {} ended ({:?}): {} records, {} checksum failures, {} resyncs",
            link,
            final_state,
            stats.records_decoded,
            stats.framing.checksum_failures,
            stats.framing.resyncs
        );
    }

    fn process_chunk(&mut self, chunk: &[u8]) {
        let frames = self.reconstructor.feed(chunk);
        let events = self.reconstructor.take_events();
        for event in &events {
            debug!("Framing event ({:?}): {}", event.severity(), event);
        }
        let last_event = events.last().map(ToString::to_string);

        let mut decoded = 0u64;
        let mut skipped = 0u64;
        let mut warnings = 0u64;
        let mut errors = 0u64;
        let mut dropped = 0u64;

        for frame in &frames {
            if !self.config.decodes(frame.message_id()) {
                trace!("Skipping message {:#04x}", frame.message_id());
                skipped += 1;
                continue;
            }

            let report = self.decoder.decode(frame.payload());
            warnings += report.warnings.len() as u64;
            if report.error.is_some() {
                errors += 1;
            }

            let record = Arc::new(report.record);
            trace!(
                "Record {:?}: {} field(s)",
                record.packet_counter(),
                record.available_fields().len()
            );
            if !self.deliver(Arc::clone(&record)) {
                dropped += 1;
            }
            self.latest_tx.send_replace(Some(record));
            decoded += 1;
        }

        let framing = self.reconstructor.stats();
        self.stats_tx.send_modify(|stats| {
            stats.chunks_received += 1;
            stats.bytes_received += chunk.len() as u64;
            stats.framing = framing;
            stats.framing_events += events.len() as u64;
            if last_event.is_some() {
                stats.last_framing_event = last_event;
            }
            stats.records_decoded += decoded;
            stats.frames_skipped += skipped;
            stats.decode_warnings += warnings;
            stats.decode_errors += errors;
            stats.records_dropped += dropped;
        });
    }

    /// Returns false when the record had to be dropped.
    fn deliver(&mut self, record: Arc<MeasurementRecord>) -> bool {
        let Some(tx) = self.records_tx.as_ref() else {
            return true;
        };
        match tx.try_send(record) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!("Record consumer lagging, dropping record");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("Record receiver dropped, publishing latest only");
                self.records_tx = None;
                true
            }
        }
    }
}
