//! Per-tick aggregate and trend types
//!
//! A `TickAggregate` is the unit stored in the sliding history window: the
//! call counts observed during one tick of the host application loop, frozen
//! once the external clock advances past that tick.

use crate::types::sample::MethodId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Three-state classification of a method's call count relative to the
/// immediately preceding tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

impl Trend {
    /// Classify `current` against `previous`.
    pub fn classify(previous: u64, current: u64) -> Self {
        match current.cmp(&previous) {
            std::cmp::Ordering::Greater => Self::Increasing,
            std::cmp::Ordering::Less => Self::Decreasing,
            std::cmp::Ordering::Equal => Self::Stable,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Stable => "stable",
            Self::Decreasing => "decreasing",
        }
    }
}

/// Call counts for one finalized tick. Immutable once stored; destroyed only
/// by history window eviction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickAggregate {
    /// The logical tick number. Unique and monotonically increasing once
    /// finalized; a tick is never re-finalized.
    pub tick: u64,

    /// Wall-clock time the aggregate was finalized, nanoseconds since epoch
    pub timestamp: u64,

    /// Call count observed per method during the tick window
    pub counts: HashMap<MethodId, u64>,

    /// Measured wall-clock span of the tick, if the host clock reports it
    pub duration_millis: Option<f64>,

    /// Whether the host flagged this tick as exceeding its duration budget.
    /// Carried through from the tick clock's own instrumentation.
    pub problem_tick: bool,
}

impl TickAggregate {
    /// Total calls observed across all methods in this tick.
    pub fn total_calls(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Number of distinct methods observed in this tick.
    pub fn method_count(&self) -> usize {
        self.counts.len()
    }
}
