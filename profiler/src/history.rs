//! Bounded sliding window of finalized tick aggregates
//!
//! The window is keyed by tick number and capacity-bounded. Eviction always
//! removes the numerically lowest tick numbers first, regardless of insertion
//! order, so an out-of-order finalization cannot corrupt the window. Readers
//! receive `Arc` clones of immutable aggregates and never observe a partially
//! populated entry.

use std::collections::BTreeMap;
use std::ops::RangeInclusive;
use std::sync::{Arc, RwLock};
use tickscope_shared::TickAggregate;

/// Capacity-bounded, internally synchronized tick history.
#[derive(Debug)]
pub struct HistoryWindow {
    capacity: usize,
    ticks: RwLock<BTreeMap<u64, Arc<TickAggregate>>>,
}

impl HistoryWindow {
    /// Create a window retaining at most `capacity` aggregates.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            ticks: RwLock::new(BTreeMap::new()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Insert a finalized aggregate, evicting the lowest-numbered entries
    /// until the window is back within capacity. Returns the number of
    /// evicted aggregates.
    pub fn insert(&self, aggregate: TickAggregate) -> usize {
        let mut ticks = self.ticks.write().unwrap();
        ticks.insert(aggregate.tick, Arc::new(aggregate));
        let mut evicted = 0;
        while ticks.len() > self.capacity {
            ticks.pop_first();
            evicted += 1;
        }
        evicted
    }

    /// Fetch a single tick's aggregate.
    pub fn get(&self, tick: u64) -> Option<Arc<TickAggregate>> {
        self.ticks.read().unwrap().get(&tick).cloned()
    }

    /// Fetch all aggregates present in `range` (absent ticks are simply not
    /// included).
    pub fn range(&self, range: RangeInclusive<u64>) -> BTreeMap<u64, Arc<TickAggregate>> {
        self.ticks
            .read()
            .unwrap()
            .range(range)
            .map(|(tick, aggregate)| (*tick, aggregate.clone()))
            .collect()
    }

    /// The most recently finalized (highest-numbered) aggregate.
    pub fn latest(&self) -> Option<Arc<TickAggregate>> {
        self.ticks
            .read()
            .unwrap()
            .last_key_value()
            .map(|(_, aggregate)| aggregate.clone())
    }

    /// Tick numbers currently retained, in ascending order.
    pub fn tick_numbers(&self) -> Vec<u64> {
        self.ticks.read().unwrap().keys().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.ticks.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
