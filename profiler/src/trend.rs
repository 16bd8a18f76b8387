//! Per-method trend classification
//!
//! When a tick finalizes, each method present in it is compared against its
//! count in the immediately preceding tick (tick - 1) from the history
//! window. A method with no baseline there has no classification: any stored
//! trend is cleared so queries report unknown rather than something stale
//! from two ticks prior. A method absent from the new tick is left untouched;
//! its trend is undefined, not reset, while it is silent.

use crate::history::HistoryWindow;
use std::collections::HashMap;
use std::sync::RwLock;
use tickscope_shared::{MethodId, Trend};

/// Internally synchronized store of the latest trend per method.
#[derive(Debug, Default)]
pub struct TrendTracker {
    trends: RwLock<HashMap<MethodId, Trend>>,
}

impl TrendTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update trends for a newly finalized tick. `counts` are the new tick's
    /// counts; baselines come from tick - 1 in `history`. Trends are not
    /// computed across gaps: if tick - 1 is absent from history, no method
    /// gets a classification this round.
    pub fn update(&self, tick: u64, counts: &HashMap<MethodId, u64>, history: &HistoryWindow) {
        let previous = tick.checked_sub(1).and_then(|prev| history.get(prev));
        let mut trends = self.trends.write().unwrap();

        for (method, &count) in counts {
            match previous.as_ref().and_then(|p| p.counts.get(method)) {
                Some(&baseline) => {
                    trends.insert(method.clone(), Trend::classify(baseline, count));
                }
                None => {
                    // No baseline in the preceding tick: the method's trend
                    // is unknown, never a leftover classification.
                    trends.remove(method);
                }
            }
        }
    }

    /// The latest classification for `method`, or `None` if it has never been
    /// observed in two consecutive finalized ticks.
    pub fn get(&self, method: &str) -> Option<Trend> {
        self.trends.read().unwrap().get(method).copied()
    }

    /// Snapshot of all current classifications.
    pub fn snapshot(&self) -> HashMap<MethodId, Trend> {
        self.trends.read().unwrap().clone()
    }

    pub fn len(&self) -> usize {
        self.trends.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
