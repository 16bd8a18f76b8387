//! Tick-boundary accumulation
//!
//! `TickAggregator` owns the in-progress count map for the tick currently
//! being accumulated. Each poll cycle records drained (and filtered) samples
//! into it; when the external clock reports a higher tick, the accumulated
//! counts are frozen into a `FinalizedTick` and accumulation restarts under
//! the new tick number.

use std::collections::HashMap;
use tickscope_shared::MethodId;

/// Counts frozen at a tick boundary, ready for threshold checks, trend
/// updates, and insertion into the history window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FinalizedTick {
    /// The tick the counts were accumulated under
    pub tick: u64,

    /// Call counts per method. May be empty if nothing was drained or
    /// everything was filtered out; empty finalizations are not inserted
    /// into history.
    pub counts: HashMap<MethodId, u64>,
}

impl FinalizedTick {
    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }
}

/// Accumulates per-method counts for the current tick and detects boundary
/// crossings against the external clock.
#[derive(Debug)]
pub struct TickAggregator {
    current_tick: u64,
    counts: HashMap<MethodId, u64>,
}

impl TickAggregator {
    /// Start accumulating under `initial_tick` (the clock value at start).
    pub fn new(initial_tick: u64) -> Self {
        Self {
            current_tick: initial_tick,
            counts: HashMap::new(),
        }
    }

    /// The tick currently being accumulated.
    pub fn current_tick(&self) -> u64 {
        self.current_tick
    }

    /// Record one observation of `method` in the current tick window.
    pub fn record(&mut self, method: &str) {
        *self.counts.entry(method.to_string()).or_insert(0) += 1;
    }

    /// Compare the externally reported tick against the tick being
    /// accumulated. Returns `None` while the tick is unchanged. When the
    /// external tick is strictly greater, the accumulated counts are
    /// finalized under the old tick number and accumulation restarts under
    /// the new one.
    ///
    /// Ticks may jump by more than one (host paused, poll cycle delayed);
    /// everything accumulated so far still finalizes as a single aggregate
    /// under the old tick number. No synthetic aggregates are invented for
    /// skipped tick numbers.
    pub fn observe_clock(&mut self, external_tick: u64) -> Option<FinalizedTick> {
        if external_tick <= self.current_tick {
            return None;
        }

        let finalized = FinalizedTick {
            tick: self.current_tick,
            counts: std::mem::take(&mut self.counts),
        };
        self.current_tick = external_tick;
        Some(finalized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_advance_keeps_accumulating() {
        let mut aggregator = TickAggregator::new(5);
        aggregator.record("pkg.Foo.bar");
        assert!(aggregator.observe_clock(5).is_none());
        aggregator.record("pkg.Foo.bar");

        let finalized = aggregator.observe_clock(6).unwrap();
        assert_eq!(finalized.tick, 5);
        assert_eq!(finalized.counts["pkg.Foo.bar"], 2);
    }

    #[test]
    fn test_advance_resets_accumulation() {
        let mut aggregator = TickAggregator::new(1);
        aggregator.record("a");
        let first = aggregator.observe_clock(2).unwrap();
        assert_eq!(first.tick, 1);
        assert_eq!(aggregator.current_tick(), 2);

        aggregator.record("b");
        let second = aggregator.observe_clock(3).unwrap();
        assert_eq!(second.tick, 2);
        assert_eq!(second.counts.len(), 1);
        assert_eq!(second.counts["b"], 1);
    }

    #[test]
    fn test_tick_jump_finalizes_single_aggregate() {
        let mut aggregator = TickAggregator::new(10);
        aggregator.record("a");
        aggregator.record("a");

        // Host paused: the clock jumps from 10 to 15.
        let finalized = aggregator.observe_clock(15).unwrap();
        assert_eq!(finalized.tick, 10);
        assert_eq!(finalized.counts["a"], 2);
        assert_eq!(aggregator.current_tick(), 15);

        // Nothing synthetic for ticks 11..=14.
        assert!(aggregator.observe_clock(15).is_none());
    }

    #[test]
    fn test_empty_finalization() {
        let mut aggregator = TickAggregator::new(1);
        let finalized = aggregator.observe_clock(2).unwrap();
        assert!(finalized.is_empty());
    }

    #[test]
    fn test_regressed_clock_is_ignored() {
        // The clock contract is monotonic non-decreasing; a stale reading
        // must not finalize anything.
        let mut aggregator = TickAggregator::new(5);
        aggregator.record("a");
        assert!(aggregator.observe_clock(4).is_none());
        assert_eq!(aggregator.current_tick(), 5);
    }
}
