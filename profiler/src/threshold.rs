//! Excessive-call threshold monitoring
//!
//! When a tick finalizes, each method's count is checked against the
//! configured per-tick threshold. Alerts are a side-effecting notification
//! (a `tracing` warning) returned to the caller for inspection; they are not
//! stored and not retried.

use std::collections::HashMap;
use tickscope_shared::MethodId;
use tracing::warn;

/// One excessive-call alert for a method in a finalized tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ThresholdAlert {
    pub method: MethodId,
    pub count: u64,
    pub tick: u64,
}

/// Checks finalized tick counts against a fixed threshold.
#[derive(Debug, Clone, Copy)]
pub struct ThresholdMonitor {
    threshold: i64,
}

impl ThresholdMonitor {
    /// A threshold of zero or below disables alerting entirely.
    pub fn new(threshold: i64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn is_enabled(&self) -> bool {
        self.threshold > 0
    }

    /// Emit one alert per method whose count is strictly greater than the
    /// threshold. Disabled monitors perform no work at all.
    pub fn check(&self, tick: u64, counts: &HashMap<MethodId, u64>) -> Vec<ThresholdAlert> {
        if self.threshold <= 0 {
            return Vec::new();
        }

        let threshold = self.threshold as u64;
        let mut alerts = Vec::new();
        for (method, &count) in counts {
            if count > threshold {
                warn!(
                    "excessive method calls: {} was called {} times in tick {}",
                    method, count, tick
                );
                alerts.push(ThresholdAlert {
                    method: method.clone(),
                    count,
                    tick,
                });
            }
        }
        alerts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn counts(entries: &[(&str, u64)]) -> HashMap<MethodId, u64> {
        entries.iter().map(|(m, c)| (m.to_string(), *c)).collect()
    }

    #[test]
    fn test_disabled_at_zero() {
        let monitor = ThresholdMonitor::new(0);
        assert!(!monitor.is_enabled());
        let alerts = monitor.check(1, &counts(&[("a", u64::MAX)]));
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_disabled_when_negative() {
        let monitor = ThresholdMonitor::new(-5);
        assert!(monitor.check(1, &counts(&[("a", 100)])).is_empty());
    }

    #[test]
    fn test_strictly_greater_comparison() {
        let monitor = ThresholdMonitor::new(100);

        // Exactly at the threshold: no alert.
        assert!(monitor.check(1, &counts(&[("a", 100)])).is_empty());

        // One over: exactly one alert for that method and tick.
        let alerts = monitor.check(1, &counts(&[("a", 101)]));
        assert_eq!(
            alerts,
            vec![ThresholdAlert {
                method: "a".to_string(),
                count: 101,
                tick: 1,
            }]
        );
    }

    #[test]
    fn test_multiple_offenders() {
        let monitor = ThresholdMonitor::new(10);
        let mut alerts = monitor.check(3, &counts(&[("a", 50), ("b", 5), ("c", 11)]));
        alerts.sort_by(|x, y| x.method.cmp(&y.method));
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].method, "a");
        assert_eq!(alerts[1].method, "c");
    }
}
