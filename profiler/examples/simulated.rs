//! Simulated tick-driven host exercising the full profiling pipeline.
//!
//! Runs a synthetic application loop that advances a tick clock and emits
//! method samples with a drifting workload, while the profiler collects,
//! classifies trends, and flags excessive call volumes. Writes a JSON report
//! at the end.
//!
//! ```sh
//! cargo run --example simulated -- --ticks 100 --output report.json
//! ```

use anyhow::Result;
use clap::Parser;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tickscope_profiler::{
    MethodProfiler, ProfileReport, ProfilerConfig, QueueSource, ReportOptions, TickClock,
};
use tickscope_shared::utils::time::system_time_nanos;
use tickscope_shared::RawSample;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "simulated")]
#[command(about = "Simulated tick loop driving the tickscope profiler", long_about = None)]
struct Args {
    /// Number of host ticks to simulate
    #[arg(long, default_value = "100")]
    ticks: u64,

    /// Wall-clock duration of each simulated tick in milliseconds
    #[arg(long, default_value = "50")]
    tick_millis: u64,

    /// Excessive-call alert threshold (0 disables)
    #[arg(long, default_value = "1000")]
    threshold: i64,

    /// Output path for the JSON report
    #[arg(short, long, default_value = "tickscope-report.json")]
    output: String,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

struct SimulatedClock {
    tick: AtomicU64,
    tick_millis: f64,
}

impl TickClock for SimulatedClock {
    fn current_tick(&self) -> u64 {
        self.tick.load(Ordering::Relaxed)
    }

    fn tick_duration_millis(&self, _tick: u64) -> Option<f64> {
        Some(self.tick_millis)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let clock = Arc::new(SimulatedClock {
        tick: AtomicU64::new(0),
        tick_millis: args.tick_millis as f64,
    });
    let (source, sink) = QueueSource::channel();

    let profiler = MethodProfiler::new(
        ProfilerConfig {
            threshold: args.threshold,
            ..Default::default()
        },
        clock.clone(),
        Box::new(source),
    )?;
    profiler.start().await?;

    info!(
        "simulating {} ticks of {}ms each",
        args.ticks, args.tick_millis
    );

    for tick in 0..args.ticks {
        // Steady worker plus a workload that ramps and drops, crossing the
        // default alert threshold every so often.
        let world = 40 + (tick % 10) * 4;
        let entity = if tick % 25 == 20 { 1_200 } else { 200 + tick % 7 };

        for _ in 0..world {
            sink.push(RawSample::new("game.World.tick", system_time_nanos()));
        }
        for _ in 0..entity {
            sink.push(RawSample::new("game.Entity.update", system_time_nanos()));
        }

        tokio::time::sleep(Duration::from_millis(args.tick_millis)).await;
        clock.tick.store(tick + 1, Ordering::Relaxed);
    }

    // Let the final tick finalize before stopping.
    tokio::time::sleep(Duration::from_millis(args.tick_millis)).await;
    profiler.stop().await?;

    let report = ProfileReport::build(&profiler, &ReportOptions::default());
    println!(
        "collected {} ticks, {} unique methods, {:.1} calls/tick overall",
        report.summary.tick_count,
        report.summary.unique_methods,
        report.summary.overall_avg_calls_per_tick
    );
    for entry in &report.summary.top_methods {
        let trend = profiler
            .trend(&entry.method)
            .map(|t| t.label())
            .unwrap_or("unknown");
        println!(
            "  {}: {:.1} calls/tick over {} ticks ({})",
            entry.method, entry.avg_calls_per_tick, entry.ticks_seen, trend
        );
    }

    report.write_json(&args.output)?;
    println!("report written to {}", args.output);
    Ok(())
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
