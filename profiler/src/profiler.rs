//! Profiler lifecycle, scheduler, and query surface
//!
//! `MethodProfiler` coordinates the whole engine. `start` opens the sample
//! source and spawns a dedicated poll task; each poll cycle drains the
//! source, filters and accumulates samples, and finalizes a tick when the
//! external clock advances. Finalization runs the threshold monitor, then
//! the trend tracker, then inserts into the history window. `stop` cancels
//! the task at its next checkpoint and waits for it to fully exit, so the
//! transient spool artifact is always released before `stop` returns.
//!
//! The poll task is the sole writer to the aggregation state; filter
//! mutation and every query below are safe from any thread at any time.

use crate::clock::TickClock;
use crate::config::ProfilerConfig;
use crate::error::ProfilerError;
use crate::filter::FilterSet;
use crate::history::HistoryWindow;
use crate::source::SampleSource;
use crate::threshold::ThresholdMonitor;
use crate::tick::TickAggregator;
use crate::trend::TrendTracker;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tickscope_shared::utils::time::system_time_nanos;
use tickscope_shared::{MethodId, TickAggregate, Trend};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Snapshot of the profiler's current state, for status displays.
#[derive(Debug, Clone, Serialize)]
pub struct ProfilerStatus {
    pub active: bool,
    pub current_tick: u64,
    pub history_len: usize,
    pub history_capacity: usize,
    pub threshold: i64,
    pub filters: Vec<String>,
    pub sample_rate_ms: u64,
}

/// One poll/finalize/insert pipeline instance, owned by the poll task.
pub(crate) struct PollPipeline {
    clock: Arc<dyn TickClock>,
    source: Box<dyn SampleSource>,
    filters: Arc<FilterSet>,
    history: Arc<HistoryWindow>,
    trends: Arc<TrendTracker>,
    threshold: ThresholdMonitor,
    aggregator: TickAggregator,
    last_tick: Arc<AtomicU64>,
}

impl PollPipeline {
    /// Run one poll cycle: drain, filter, accumulate, and finalize if the
    /// clock advanced. A failed drain is logged and treated as zero samples;
    /// it never takes the worker down.
    fn poll_cycle(&mut self) {
        let samples = match self.source.drain() {
            Ok(samples) => samples,
            Err(e) => {
                warn!("sample drain failed, treating cycle as empty: {}", e);
                Vec::new()
            }
        };

        for sample in &samples {
            if self.filters.matches(&sample.method) {
                self.aggregator.record(&sample.method);
            }
        }

        let external = self.clock.current_tick();
        self.last_tick.store(external, Ordering::Relaxed);

        if let Some(finalized) = self.aggregator.observe_clock(external) {
            // Ticks with no drained samples, or with everything filtered
            // out, are not inserted: "no data" is distinct from "zero calls".
            if finalized.is_empty() {
                return;
            }

            self.threshold.check(finalized.tick, &finalized.counts);
            self.trends
                .update(finalized.tick, &finalized.counts, &self.history);
            self.history.insert(TickAggregate {
                tick: finalized.tick,
                timestamp: system_time_nanos(),
                counts: finalized.counts,
                duration_millis: self.clock.tick_duration_millis(finalized.tick),
                problem_tick: self.clock.is_problem_tick(finalized.tick),
            });
        }
    }

    fn into_source(self) -> Box<dyn SampleSource> {
        self.source
    }
}

struct Worker {
    cancel: CancellationToken,
    handle: JoinHandle<Box<dyn SampleSource>>,
}

struct Inner {
    /// The sample source, parked here while the profiler is stopped.
    source: Option<Box<dyn SampleSource>>,
    worker: Option<Worker>,
}

/// Continuously running, tick-synchronized method call frequency profiler.
pub struct MethodProfiler {
    config: ProfilerConfig,
    clock: Arc<dyn TickClock>,
    filters: Arc<FilterSet>,
    history: Arc<HistoryWindow>,
    trends: Arc<TrendTracker>,
    last_tick: Arc<AtomicU64>,
    active: AtomicBool,
    inner: tokio::sync::Mutex<Inner>,
}

impl MethodProfiler {
    /// Create a profiler over the given clock and sample source. The
    /// configuration is validated here; invalid values never reach the
    /// running pipeline.
    pub fn new(
        config: ProfilerConfig,
        clock: Arc<dyn TickClock>,
        source: Box<dyn SampleSource>,
    ) -> Result<Self, ProfilerError> {
        config.validate()?;
        let filters = Arc::new(FilterSet::with_patterns(&config.filters)?);
        let history = Arc::new(HistoryWindow::new(config.history_capacity));

        Ok(Self {
            config,
            clock,
            filters,
            history,
            trends: Arc::new(TrendTracker::new()),
            last_tick: Arc::new(AtomicU64::new(0)),
            active: AtomicBool::new(false),
            inner: tokio::sync::Mutex::new(Inner {
                source: Some(source),
                worker: None,
            }),
        })
    }

    /// Start the background poll loop. Fails with `AlreadyRunning` if the
    /// profiler is not stopped. A failure to open the sample source leaves
    /// the profiler exactly as it was: no worker, no leaked spool artifact.
    pub async fn start(&self) -> Result<(), ProfilerError> {
        let mut inner = self.inner.lock().await;
        if inner.worker.is_some() {
            return Err(ProfilerError::AlreadyRunning);
        }

        let mut source = inner.source.take().ok_or(ProfilerError::AlreadyRunning)?;
        if let Err(e) = source.open() {
            inner.source = Some(source);
            return Err(ProfilerError::Source(e));
        }

        let initial_tick = self.clock.current_tick();
        self.last_tick.store(initial_tick, Ordering::Relaxed);

        let mut pipeline = PollPipeline {
            clock: self.clock.clone(),
            source,
            filters: self.filters.clone(),
            history: self.history.clone(),
            trends: self.trends.clone(),
            threshold: ThresholdMonitor::new(self.config.threshold),
            aggregator: TickAggregator::new(initial_tick),
            last_tick: self.last_tick.clone(),
        };

        let cancel = CancellationToken::new();
        let loop_cancel = cancel.clone();
        let poll_interval = self.config.poll_interval;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(poll_interval);
            // A cycle that overruns simply delays the next one; cycles never
            // overlap and never burst to catch up.
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = loop_cancel.cancelled() => break,
                    _ = interval.tick() => pipeline.poll_cycle(),
                }
            }

            let mut source = pipeline.into_source();
            if let Err(e) = source.close() {
                warn!("failed to release sample source: {}", e);
            }
            source
        });

        inner.worker = Some(Worker { cancel, handle });
        self.active.store(true, Ordering::Release);
        info!(
            "started method call frequency profiler (tick {}, poll interval {:?})",
            initial_tick, self.config.poll_interval
        );
        Ok(())
    }

    /// Stop the poll loop and release the sample source. Idempotent: calling
    /// it while already stopped is a no-op. Does not return until the worker
    /// has fully exited and cleanup has run.
    pub async fn stop(&self) -> Result<(), ProfilerError> {
        let mut inner = self.inner.lock().await;
        let worker = match inner.worker.take() {
            Some(worker) => worker,
            None => return Ok(()),
        };

        worker.cancel.cancel();
        match worker.handle.await {
            Ok(source) => inner.source = Some(source),
            Err(e) => warn!("poll worker terminated abnormally: {}", e),
        }
        self.active.store(false, Ordering::Release);
        info!("stopped method call frequency profiler");
        Ok(())
    }

    /// Whether the poll loop is currently running.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    // --- query surface -----------------------------------------------------

    /// The aggregate for a single finalized tick, if retained.
    pub fn tick(&self, tick: u64) -> Option<Arc<TickAggregate>> {
        self.history.get(tick)
    }

    /// Aggregates for all retained ticks in `start..=end`.
    pub fn range(&self, start: u64, end: u64) -> BTreeMap<u64, Arc<TickAggregate>> {
        self.history.range(start..=end)
    }

    /// Latest trend classification for a method. `None` means the method has
    /// not been observed in two consecutive finalized ticks.
    pub fn trend(&self, method: &str) -> Option<Trend> {
        self.trends.get(method)
    }

    /// Snapshot of all current trend classifications.
    pub fn trends(&self) -> HashMap<MethodId, Trend> {
        self.trends.snapshot()
    }

    pub fn history(&self) -> &HistoryWindow {
        &self.history
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Excessive-call threshold in effect. Fixed for the profiler's lifetime;
    /// changing it requires a stop and restart.
    pub fn threshold(&self) -> i64 {
        self.config.threshold
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// The most recent tick reported by the external clock.
    pub fn current_tick(&self) -> u64 {
        self.last_tick.load(Ordering::Relaxed)
    }

    // --- filter management -------------------------------------------------

    /// Add a method filter pattern. Takes effect from the next drain; already
    /// finalized ticks are unaffected. Returns `false` for a duplicate.
    pub fn add_filter(&self, pattern: &str) -> Result<bool, ProfilerError> {
        self.filters.add(pattern)
    }

    /// Remove a method filter pattern. A never-added pattern is a no-op.
    pub fn remove_filter(&self, pattern: &str) -> bool {
        self.filters.remove(pattern)
    }

    /// Remove all method filters.
    pub fn clear_filters(&self) {
        self.filters.clear()
    }

    /// Filter patterns currently in effect.
    pub fn filters(&self) -> Vec<String> {
        self.filters.patterns()
    }

    /// Point-in-time status snapshot.
    pub fn status(&self) -> ProfilerStatus {
        ProfilerStatus {
            active: self.is_active(),
            current_tick: self.current_tick(),
            history_len: self.history.len(),
            history_capacity: self.history.capacity(),
            threshold: self.config.threshold,
            filters: self.filters.patterns(),
            sample_rate_ms: self.config.sample_rate_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::QueueSource;
    use crate::source::SampleSink;
    use std::io;
    use tickscope_shared::RawSample;

    struct ManualClock(AtomicU64);

    impl ManualClock {
        fn new(tick: u64) -> Arc<Self> {
            Arc::new(Self(AtomicU64::new(tick)))
        }

        fn advance_to(&self, tick: u64) {
            self.0.store(tick, Ordering::Relaxed);
        }
    }

    impl TickClock for ManualClock {
        fn current_tick(&self) -> u64 {
            self.0.load(Ordering::Relaxed)
        }
    }

    /// Source whose drain fails a configurable number of times.
    struct FlakySource {
        inner: QueueSource,
        failures: u32,
    }

    impl SampleSource for FlakySource {
        fn open(&mut self) -> io::Result<()> {
            self.inner.open()
        }

        fn drain(&mut self) -> io::Result<Vec<RawSample>> {
            if self.failures > 0 {
                self.failures -= 1;
                return Err(io::Error::new(io::ErrorKind::Other, "substrate hiccup"));
            }
            self.inner.drain()
        }

        fn close(&mut self) -> io::Result<()> {
            self.inner.close()
        }
    }

    fn pipeline(
        clock: Arc<ManualClock>,
        source: Box<dyn SampleSource>,
        threshold: i64,
        filters: FilterSet,
    ) -> PollPipeline {
        let initial = clock.current_tick();
        PollPipeline {
            clock,
            source,
            filters: Arc::new(filters),
            history: Arc::new(HistoryWindow::new(1200)),
            trends: Arc::new(TrendTracker::new()),
            threshold: ThresholdMonitor::new(threshold),
            aggregator: TickAggregator::new(initial),
            last_tick: Arc::new(AtomicU64::new(initial)),
        }
    }

    fn feed(sink: &SampleSink, method: &str, count: usize) {
        sink.extend((0..count).map(|i| RawSample::new(method, i as u64)));
    }

    #[test]
    fn test_end_to_end_scenario() {
        let clock = ManualClock::new(1);
        let (source, sink) = QueueSource::channel();
        let mut pipeline = pipeline(clock.clone(), Box::new(source), 1000, FilterSet::new());

        // Tick 1: one hot method, one quiet one.
        feed(&sink, "pkg.Foo.bar", 1200);
        feed(&sink, "pkg.Baz.qux", 4);
        clock.advance_to(2);
        pipeline.poll_cycle();

        let tick1 = pipeline.history.get(1).unwrap();
        assert_eq!(tick1.counts["pkg.Foo.bar"], 1200);
        assert_eq!(tick1.counts["pkg.Baz.qux"], 4);
        // No prior tick yet: trend unknown.
        assert_eq!(pipeline.trends.get("pkg.Foo.bar"), None);

        // Tick 2: hot method cools off slightly.
        feed(&sink, "pkg.Foo.bar", 1100);
        feed(&sink, "pkg.Baz.qux", 4);
        clock.advance_to(3);
        pipeline.poll_cycle();

        assert_eq!(pipeline.trends.get("pkg.Foo.bar"), Some(Trend::Decreasing));
        assert_eq!(pipeline.trends.get("pkg.Baz.qux"), Some(Trend::Stable));
        assert_eq!(pipeline.history.len(), 2);
    }

    #[test]
    fn test_zero_drain_tick_not_inserted() {
        let clock = ManualClock::new(1);
        let (source, _sink) = QueueSource::channel();
        let mut pipeline = pipeline(clock.clone(), Box::new(source), 0, FilterSet::new());

        clock.advance_to(2);
        pipeline.poll_cycle();
        assert!(pipeline.history.is_empty());
    }

    #[test]
    fn test_fully_filtered_tick_not_inserted() {
        let clock = ManualClock::new(1);
        let (source, sink) = QueueSource::channel();
        let filters = FilterSet::with_patterns(&[r"^pkg\.Keep\.".to_string()]).unwrap();
        let mut pipeline = pipeline(clock.clone(), Box::new(source), 0, filters);

        feed(&sink, "pkg.Drop.everything", 50);
        clock.advance_to(2);
        pipeline.poll_cycle();

        // Samples were drained but none matched: same outcome as no data.
        assert!(pipeline.history.is_empty());
        assert_eq!(sink.pending(), 0);
    }

    #[test]
    fn test_filter_selects_methods() {
        let clock = ManualClock::new(1);
        let (source, sink) = QueueSource::channel();
        let filters = FilterSet::with_patterns(&[r"^pkg\.Keep\.".to_string()]).unwrap();
        let mut pipeline = pipeline(clock.clone(), Box::new(source), 0, filters);

        feed(&sink, "pkg.Keep.this", 3);
        feed(&sink, "pkg.Drop.that", 7);
        clock.advance_to(2);
        pipeline.poll_cycle();

        let tick1 = pipeline.history.get(1).unwrap();
        assert_eq!(tick1.counts.len(), 1);
        assert_eq!(tick1.counts["pkg.Keep.this"], 3);
    }

    #[test]
    fn test_accumulation_across_cycles_without_advance() {
        let clock = ManualClock::new(1);
        let (source, sink) = QueueSource::channel();
        let mut pipeline = pipeline(clock.clone(), Box::new(source), 0, FilterSet::new());

        feed(&sink, "a", 2);
        pipeline.poll_cycle();
        feed(&sink, "a", 3);
        pipeline.poll_cycle();
        assert!(pipeline.history.is_empty());

        clock.advance_to(2);
        pipeline.poll_cycle();
        assert_eq!(pipeline.history.get(1).unwrap().counts["a"], 5);
    }

    #[test]
    fn test_drain_failure_recovers() {
        let clock = ManualClock::new(1);
        let (inner, sink) = QueueSource::channel();
        let source = FlakySource { inner, failures: 1 };
        let mut pipeline = pipeline(clock.clone(), Box::new(source), 0, FilterSet::new());

        feed(&sink, "a", 4);
        // First cycle fails to drain: treated as empty, loop continues.
        pipeline.poll_cycle();
        assert!(pipeline.history.is_empty());

        // Samples are still pending and arrive with the next cycle.
        clock.advance_to(2);
        pipeline.poll_cycle();
        assert_eq!(pipeline.history.get(1).unwrap().counts["a"], 4);
    }

    #[tokio::test]
    async fn test_start_fails_cleanly_when_source_cannot_open() {
        struct BrokenSource;

        impl SampleSource for BrokenSource {
            fn open(&mut self) -> io::Result<()> {
                Err(io::Error::new(io::ErrorKind::Other, "substrate unavailable"))
            }
            fn drain(&mut self) -> io::Result<Vec<RawSample>> {
                unreachable!("drain on a source that never opened")
            }
            fn close(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let profiler = MethodProfiler::new(
            ProfilerConfig::default(),
            ManualClock::new(0),
            Box::new(BrokenSource),
        )
        .unwrap();

        assert!(matches!(
            profiler.start().await,
            Err(ProfilerError::Source(_))
        ));
        assert!(!profiler.is_active());
        // Stop after a failed start is still a clean no-op.
        profiler.stop().await.unwrap();
    }

    #[test]
    fn test_status_snapshot() {
        let (source, _sink) = QueueSource::channel();
        let profiler = MethodProfiler::new(
            ProfilerConfig {
                threshold: 500,
                filters: vec![r"^pkg\.".to_string()],
                ..Default::default()
            },
            ManualClock::new(7),
            Box::new(source),
        )
        .unwrap();

        let status = profiler.status();
        assert!(!status.active);
        assert_eq!(status.threshold, 500);
        assert_eq!(status.filters, vec![r"^pkg\."]);
        assert_eq!(status.history_capacity, 1200);
        assert_eq!(status.sample_rate_ms, 20);
    }
}
