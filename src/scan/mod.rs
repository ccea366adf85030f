//! Scan pipeline - coordinator, stats and result sinks

mod coordinator;
mod sink;
mod stats;

pub use coordinator::{ScanCoordinator, ScanReport};
pub use sink::{LogSink, MemorySink, ResultSink, Tee};
pub use stats::{Stats, StatsBoard, StatsSnapshot};
