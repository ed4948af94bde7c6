mod demo_stack;
mod workload;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use profiler_core::{ContextManager, ProfilerConfig, Sampler, ThreadContextFactory, Timer};
use profiler_repo::FileRepository;

use demo_stack::{DemoStackSource, SharedCallStack};

/// Samples a bundled demo workload and writes its folded-stack output to a
/// file. Mirrors `pysample`'s `main.py` launcher: a positional workload
/// name, `-o/--outfile`, `-i/--interval` (minimum 5ms).
#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    /// Name of the demo workload to run; also used to derive the default
    /// output filename.
    workload: String,

    /// Save the folded-stack output to this file. Defaults to
    /// `<workload>.txt`.
    #[arg(short, long)]
    outfile: Option<PathBuf>,

    /// Sampling interval in milliseconds. Values below 5 are clamped up.
    #[arg(short, long, default_value_t = 10)]
    interval: u32,

    /// How long to run the demo workload, in milliseconds.
    #[arg(short = 'd', long, default_value_t = 2000)]
    duration: u64,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    if let Err(err) = run(cli) {
        eprintln!("profiler-cli: {err:#}");
        std::process::exit(2);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let outfile = cli
        .outfile
        .unwrap_or_else(|| PathBuf::from(format!("{}.txt", cli.workload)));

    let config = ProfilerConfig {
        interval_ms: cli.interval,
        output_threshold_ms: 0,
        ..ProfilerConfig::default()
    }
    .normalize()
    .context("invalid profiler configuration")?;

    let context_manager = Arc::new(ContextManager::new(config.context_capacity));
    let context_factory = Arc::new(ThreadContextFactory::new(config.max_stack_depth));
    let output_repo = Arc::new(
        FileRepository::new(&outfile, true).context("failed to prepare output file")?,
    );

    let call_stack = SharedCallStack::new();
    let stack_source = Arc::new(DemoStackSource::new(call_stack.clone()));

    let mut timer = Timer::new(config.interval_ms, context_manager.clone(), stack_source);
    let sampler = Sampler::new(
        config.interval_ms,
        config.output_threshold_ms,
        context_manager,
        context_factory,
        output_repo,
    );

    tracing::info!(workload = %cli.workload, outfile = %outfile.display(), "running demo workload");

    timer.start().context("failed to start sampling timer")?;
    sampler.wrap(&cli.workload, || {
        workload::run(&call_stack, Duration::from_millis(cli.duration))
    });
    timer.stop().context("failed to stop sampling timer")?;

    println!("Wrote sampling result to {}", outfile.display());
    Ok(())
}
