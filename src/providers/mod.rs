//! Provider implementations

pub mod csv_sink;
pub mod reader;
pub mod replay;

pub use csv_sink::CsvSink;
pub use reader::{ReaderProvider, WriterSink};
pub use replay::ReplayProvider;
