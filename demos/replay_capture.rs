//! Replay a raw Xbus capture and print decoded records.
//!
//! Usage: `cargo run --example replay_capture -- <capture.bin> [config.yaml] [records.csv]`
//!
//! Set `RUST_LOG=xbus=debug` to see framing and decoding anomalies.

use anyhow::{Context, bail};
use futures::StreamExt;
use tracing::info;
use tracing_subscriber::EnvFilter;
use xbus::{CsvSink, MeasurementRecord, RecordSink, Xbus, XbusConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let Some(capture) = args.next() else {
        bail!("usage: replay_capture <capture.bin> [config.yaml] [records.csv]");
    };
    let config = match args.next() {
        Some(path) => XbusConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => XbusConfig::default(),
    };
    let mut sink = match args.next() {
        Some(path) => Some(CsvSink::create(&path, true).with_context(|| format!("creating {path}"))?),
        None => None,
    };

    let mut connection = Xbus::open_with_config(&capture, config)
        .await
        .with_context(|| format!("opening {capture}"))?;
    let mut records = connection.records().context("record stream already taken")?;

    while let Some(record) = records.next().await {
        print_record(&record);
        if let Some(sink) = sink.as_mut() {
            sink.write_record(&record)?;
        }
    }
    if let Some(sink) = sink.as_mut() {
        sink.flush()?;
    }

    let stats = connection.finished().await;
    info!(
        "{}: {} records, {} checksum failures, {} resyncs, {} bytes discarded, last anomaly: {}",
        stats.link,
        stats.records_decoded,
        stats.framing.checksum_failures,
        stats.framing.resyncs,
        stats.framing.bytes_discarded,
        stats.last_framing_event.as_deref().unwrap_or("none")
    );
    Ok(())
}

fn print_record(record: &MeasurementRecord) {
    let counter = record.packet_counter().map_or("-".to_string(), |c| c.to_string());
    let orientation = record
        .euler()
        .map_or("-".to_string(), |e| format!("{:8.3} {:8.3} {:8.3}", e.roll, e.pitch, e.yaw));
    let position = record
        .lat_lon()
        .map_or("-".to_string(), |[lat, lon]| format!("{lat:.7} {lon:.7}"));
    let status = record.status_word().map_or("-".to_string(), |s| s.classify().to_string());

    println!("#{counter:>5}  rpy [{orientation}]  pos [{position}]  {status}");
}
