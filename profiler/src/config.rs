//! Profiler configuration

use crate::error::ProfilerError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default substrate sampling rate in milliseconds.
pub const DEFAULT_SAMPLE_RATE_MS: u64 = 20;

/// Default poll interval for the background scheduler. Roughly one host tick
/// at 20 ticks per second. This is a latency knob, distinct from the
/// substrate's sampling rate.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 50;

/// Default excessive-call alert threshold (calls per method per tick).
pub const DEFAULT_THRESHOLD: i64 = 1000;

/// Default history window capacity: one minute of tick data at 20 TPS.
pub const HISTORY_WINDOW_SIZE: usize = 1200;

/// Profiler configuration. Immutable once the profiler starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfilerConfig {
    /// Sampling rate of the external substrate, in milliseconds. Surfaced in
    /// status and report metadata; the substrate itself is configured out of
    /// band.
    pub sample_rate_ms: u64,

    /// Interval between poll cycles of the background scheduler.
    pub poll_interval: Duration,

    /// Per-method call count above which an alert is emitted for a tick.
    /// Zero disables alerting entirely; negative values are rejected.
    pub threshold: i64,

    /// Method name filter patterns (regular expressions). Empty means all
    /// methods match.
    pub filters: Vec<String>,

    /// Maximum number of finalized tick aggregates retained in memory.
    pub history_capacity: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            sample_rate_ms: DEFAULT_SAMPLE_RATE_MS,
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            threshold: DEFAULT_THRESHOLD,
            filters: Vec::new(),
            history_capacity: HISTORY_WINDOW_SIZE,
        }
    }
}

impl ProfilerConfig {
    /// Validate configuration. Invalid combinations are rejected here, before
    /// `start`, and never reach the running pipeline.
    pub fn validate(&self) -> Result<(), ProfilerError> {
        if self.sample_rate_ms == 0 {
            return Err(ProfilerError::InvalidConfig(
                "sample rate must be at least 1ms".to_string(),
            ));
        }

        if self.poll_interval.is_zero() {
            return Err(ProfilerError::InvalidConfig(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        if self.threshold < 0 {
            return Err(ProfilerError::InvalidConfig(
                "threshold cannot be negative".to_string(),
            ));
        }

        if self.history_capacity == 0 {
            return Err(ProfilerError::InvalidConfig(
                "history capacity must be greater than zero".to_string(),
            ));
        }

        for pattern in &self.filters {
            regex::Regex::new(pattern).map_err(|source| ProfilerError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            })?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = ProfilerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.sample_rate_ms, 20);
        assert_eq!(config.threshold, 1000);
        assert_eq!(config.history_capacity, 1200);
    }

    #[test]
    fn test_zero_sample_rate_rejected() {
        let config = ProfilerConfig {
            sample_rate_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let config = ProfilerConfig {
            poll_interval: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_negative_threshold_rejected() {
        let config = ProfilerConfig {
            threshold: -1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_threshold_allowed() {
        // Zero is valid configuration: it disables alerting.
        let config = ProfilerConfig {
            threshold: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_malformed_filter_rejected() {
        let config = ProfilerConfig {
            filters: vec!["pkg\\.(".to_string()],
            ..Default::default()
        };
        match config.validate() {
            Err(ProfilerError::InvalidPattern { pattern, .. }) => {
                assert_eq!(pattern, "pkg\\.(");
            }
            other => panic!("expected InvalidPattern, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_history_capacity_rejected() {
        let config = ProfilerConfig {
            history_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
