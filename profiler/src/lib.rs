//! Tick-synchronized method call frequency profiler
//!
//! This crate is the sampling and aggregation engine behind tickscope: it
//! consumes a stream of raw execution samples from an external sampling
//! substrate, buckets method observations by ticks of the host application
//! loop, keeps a bounded sliding window of finalized per-tick aggregates, and
//! derives per-method trend and threshold-alert signals that can be queried
//! while collection runs.
//!
//! The engine is built around a single-writer discipline: one background poll
//! task drains the sample source, finalizes ticks when the external clock
//! advances, and inserts into the history window. Filter mutation and all
//! query access are safe from any other thread at any time.

pub mod clock;
pub mod config;
pub mod error;
pub mod filter;
pub mod history;
pub mod profiler;
pub mod report;
pub mod source;
pub mod threshold;
pub mod tick;
pub mod trend;

pub use clock::TickClock;
pub use config::ProfilerConfig;
pub use error::ProfilerError;
pub use filter::FilterSet;
pub use history::HistoryWindow;
pub use profiler::{MethodProfiler, ProfilerStatus};
pub use report::{ProfileReport, ReportOptions};
pub use source::{QueueSource, SampleSink, SampleSource, SpoolSource};
pub use threshold::{ThresholdAlert, ThresholdMonitor};
pub use tickscope_shared::{MethodId, RawSample, TickAggregate, Trend};
