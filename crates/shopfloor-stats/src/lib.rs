//! Production metrics for the shop-floor simulation.
//!
//! [`MetricsRecorder`] is the concrete [`MetricsSink`] machine drivers report
//! into. It keeps a bounded buffer of raw [`MetricEvent`]s for export and
//! rolls them up per machine into [`MachineStats`]: good and scrap counts,
//! time per state bucket, quality rate, utilization, a simple OEE, and a
//! rolling good-units-per-tick throughput.
//!
//! State time is measured between consecutive state changes using the
//! simulation timestamps the drivers pass in, so results are reproducible.
//!
//! # Usage
//!
//! ```ignore
//! let ctx = SessionContext::new()
//!     .with_random(RandomStreams::new(0))
//!     .with_metrics(MetricsRecorder::new(StatsConfig::default()));
//! // ... run the orchestrator ...
//! let recorder = orchestrator.context().metrics_as::<MetricsRecorder>().unwrap();
//! let oee = recorder.machine_stats("M1").oee;
//! export_csv_to_path(recorder, Path::new("metrics.csv"))?;
//! ```
//!
//! [`MetricsSink`]: shopfloor_core::metrics::MetricsSink

pub mod export;
pub mod recorder;
pub mod window;

pub use export::{MetricsError, export_csv, export_csv_to_path};
pub use recorder::{MachineStats, MetricEvent, MetricsRecorder, StatsConfig};
pub use window::RingBuffer;
