//! Report export
//!
//! Builds the externally persisted report form purely from the profiler's
//! query surface: per-tick records with counts and trends, summary
//! aggregates, the sampling metadata in effect, and explicit gap ranges for
//! tick spans with no retained data.

use crate::error::ProfilerError;
use crate::profiler::MethodProfiler;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io;
use std::path::Path;
use tickscope_shared::utils::time::{rfc3339, system_time_nanos};
use tickscope_shared::{MethodId, Trend};

/// Options controlling report construction.
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// How many methods to rank in the summary's top list.
    pub top_methods: usize,

    /// Restrict the report to an inclusive tick range. `None` covers the
    /// whole retained window.
    pub range: Option<(u64, u64)>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self {
            top_methods: 10,
            range: None,
        }
    }
}

/// Sampling configuration in effect when the report was generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingMetadata {
    pub sample_rate_ms: u64,
    pub poll_interval_ms: u64,
    pub threshold: i64,
    pub filters: Vec<String>,
    pub history_capacity: usize,
}

/// One method's count (and current trend) within a tick record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodRecord {
    pub method: MethodId,
    pub count: u64,
    pub trend: Option<Trend>,
}

/// One finalized tick as exported.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickRecord {
    pub tick: u64,
    pub timestamp: String,
    pub duration_millis: Option<f64>,
    pub problem_tick: bool,
    /// Methods sorted by call count, highest first.
    pub methods: Vec<MethodRecord>,
}

/// An inclusive range of tick numbers inside the covered span for which no
/// aggregate was retained.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickGap {
    pub start: u64,
    pub end: u64,
}

/// A method's ranking entry in the report summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MethodAverage {
    pub method: MethodId,
    pub total_calls: u64,
    pub ticks_seen: u64,
    pub avg_calls_per_tick: f64,
}

/// Summary aggregates over the exported ticks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub tick_count: usize,
    pub unique_methods: usize,
    pub overall_avg_calls_per_tick: f64,
    pub top_methods: Vec<MethodAverage>,
}

/// Full report shape consumed by downstream serialization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileReport {
    pub generated_at: String,
    pub metadata: SamplingMetadata,
    pub ticks: Vec<TickRecord>,
    pub gaps: Vec<TickGap>,
    pub summary: ReportSummary,
}

impl ProfileReport {
    /// Build a report from the profiler's query surface.
    pub fn build(profiler: &MethodProfiler, options: &ReportOptions) -> Self {
        let (start, end) = options.range.unwrap_or((0, u64::MAX));
        let aggregates = profiler.range(start, end);
        let trends = profiler.trends();
        let config = profiler.config();

        let mut ticks = Vec::with_capacity(aggregates.len());
        let mut gaps = Vec::new();
        let mut totals: HashMap<MethodId, (u64, u64)> = HashMap::new();
        let mut total_calls: u64 = 0;
        let mut previous_tick: Option<u64> = None;

        for (tick, aggregate) in &aggregates {
            if let Some(prev) = previous_tick {
                if tick - prev > 1 {
                    gaps.push(TickGap {
                        start: prev + 1,
                        end: tick - 1,
                    });
                }
            }
            previous_tick = Some(*tick);

            let mut methods: Vec<MethodRecord> = aggregate
                .counts
                .iter()
                .map(|(method, &count)| MethodRecord {
                    method: method.clone(),
                    count,
                    trend: trends.get(method).copied(),
                })
                .collect();
            methods.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.method.cmp(&b.method)));

            for record in &methods {
                let entry = totals.entry(record.method.clone()).or_insert((0, 0));
                entry.0 += record.count;
                entry.1 += 1;
                total_calls += record.count;
            }

            ticks.push(TickRecord {
                tick: *tick,
                timestamp: rfc3339(aggregate.timestamp),
                duration_millis: aggregate.duration_millis,
                problem_tick: aggregate.problem_tick,
                methods,
            });
        }

        let mut top_methods: Vec<MethodAverage> = totals
            .into_iter()
            .map(|(method, (calls, seen))| MethodAverage {
                method,
                total_calls: calls,
                ticks_seen: seen,
                avg_calls_per_tick: calls as f64 / seen as f64,
            })
            .collect();
        top_methods.sort_by(|a, b| {
            b.avg_calls_per_tick
                .total_cmp(&a.avg_calls_per_tick)
                .then_with(|| a.method.cmp(&b.method))
        });
        let unique_methods = top_methods.len();
        top_methods.truncate(options.top_methods);

        let tick_count = ticks.len();
        let overall_avg = if tick_count == 0 {
            0.0
        } else {
            total_calls as f64 / tick_count as f64
        };

        Self {
            generated_at: rfc3339(system_time_nanos()),
            metadata: SamplingMetadata {
                sample_rate_ms: config.sample_rate_ms,
                poll_interval_ms: config.poll_interval.as_millis() as u64,
                threshold: config.threshold,
                filters: profiler.filters(),
                history_capacity: config.history_capacity,
            },
            ticks,
            gaps,
            summary: ReportSummary {
                tick_count,
                unique_methods,
                overall_avg_calls_per_tick: overall_avg,
                top_methods,
            },
        }
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: impl AsRef<Path>) -> Result<(), ProfilerError> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(file, self).map_err(io::Error::from)?;
        Ok(())
    }
}
