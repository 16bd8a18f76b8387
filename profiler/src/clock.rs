//! External tick clock boundary
//!
//! The host application's own loop advances a monotonic tick counter; the
//! profiler only ever observes it. Tick duration and problem-tick flags are
//! the host's instrumentation, carried through into finalized aggregates
//! rather than computed here.

/// Oracle for the host application's tick counter.
///
/// `current_tick` must be monotonically non-decreasing. It is called once per
/// poll cycle and must be cheap.
pub trait TickClock: Send + Sync {
    /// The tick the host loop is currently executing.
    fn current_tick(&self) -> u64;

    /// Measured wall-clock span of a completed tick, if the host records it.
    fn tick_duration_millis(&self, _tick: u64) -> Option<f64> {
        None
    }

    /// Whether the host flagged a completed tick as exceeding its duration
    /// budget.
    fn is_problem_tick(&self, _tick: u64) -> bool {
        false
    }
}
