//! Connection handle over a running decode task

use futures::StreamExt;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tokio_stream::wrappers::{ReceiverStream, WatchStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::XbusConfig;
use crate::driver::{Driver, LinkState, LinkStats};
use crate::provider::Provider;
use crate::stream::ThrottleExt;
use crate::types::{MeasurementRecord, UpdateRate};

/// Connection to one Xbus link
///
/// Owns the decode task; dropping the connection cancels it.
pub struct XbusConnection {
    /// In-order record receiver, until taken by `records()`
    records: Option<mpsc::Receiver<Arc<MeasurementRecord>>>,

    /// Latest record watch receiver
    latest: watch::Receiver<Option<Arc<MeasurementRecord>>>,

    /// Link counters
    stats: watch::Receiver<LinkStats>,

    /// Device output rate
    nominal_rate_hz: f64,

    /// Cancellation token for stopping the task
    cancel: CancellationToken,
}

impl XbusConnection {
    /// Start decoding bytes from `provider`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<P: Provider>(provider: P, config: &XbusConfig) -> Self {
        info!("Starting Xbus connection on {}", provider.link_name());
        let channels = Driver::spawn(provider, config);

        Self {
            records: Some(channels.records),
            latest: channels.latest,
            stats: channels.stats,
            nominal_rate_hz: config.nominal_rate_hz,
            cancel: channels.cancel,
        }
    }

    /// Every decoded record, in arrival order.
    ///
    /// The stream can be taken once; later calls return `None`. If the consumer falls
    /// more than `record_channel_capacity` records behind, newer records are dropped
    /// and counted in [`LinkStats::records_dropped`].
    pub fn records(&mut self) -> Option<ReceiverStream<Arc<MeasurementRecord>>> {
        self.records.take().map(ReceiverStream::new)
    }

    /// Latest-value subscription, throttled to `rate`.
    ///
    /// Intermediate records are skipped when the consumer or the rate cap is slower
    /// than the device. The stream ends when the decode task stops.
    pub fn subscribe(&self, rate: UpdateRate) -> BoxStream<'static, Arc<MeasurementRecord>> {
        let updates = WatchStream::new(self.latest.clone()).filter_map(|opt| async move { opt });

        match rate.throttle_interval(self.nominal_rate_hz) {
            None => updates.boxed(),
            Some(interval) => {
                debug!("Subscription throttled to one record per {:?}", interval);
                updates.throttle(interval).boxed()
            }
        }
    }

    /// Most recent record, if any has been decoded.
    pub fn latest(&self) -> Option<Arc<MeasurementRecord>> {
        self.latest.borrow().clone()
    }

    /// Current link counters.
    pub fn stats(&self) -> LinkStats {
        self.stats.borrow().clone()
    }

    /// Wait for the decode task to stop and return its final counters.
    pub async fn finished(&self) -> LinkStats {
        let mut stats = self.stats.clone();
        if stats.wait_for(|s| s.state != LinkState::Running).await.is_err() {
            debug!("Decode task dropped without a final state");
        }
        stats.borrow().clone()
    }

    pub fn is_running(&self) -> bool {
        self.stats.borrow().state == LinkState::Running
    }

    pub fn link_name(&self) -> String {
        self.stats.borrow().link.clone()
    }

    pub fn nominal_rate_hz(&self) -> f64 {
        self.nominal_rate_hz
    }

    /// Stop the decode task. Open streams end once it has shut down.
    pub fn close(&self) {
        debug!("Closing Xbus connection");
        self.cancel.cancel();
    }
}

impl Drop for XbusConnection {
    fn drop(&mut self) {
        debug!("Dropping Xbus connection");
        // Cancel tasks on drop for clean shutdown
        self.cancel.cancel();
    }
}
