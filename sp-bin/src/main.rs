mod cli;
mod io;

use anyhow::Context;
use clap::Parser;
use cli::Cli;
use stackplan::{Annealer, Config, DieStack, Rng};
use std::time::Instant;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(&cli) {
        // Startup failures (bad config or inputs) are the only non-zero
        // exits; an infeasible run still completes cleanly.
        eprintln!("stackplan: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let start = Instant::now();

    let config = Config::load(&cli.config).context("loading configuration")?;

    // RUST_LOG overrides the config-selected verbosity.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.filter()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("stackplan: 3D floorplanning for benchmark `{}`", cli.benchmark);

    let mut blocks = io::parse_blocks(&cli.blocks).context("parsing blocks")?;
    let mut nets = io::parse_nets(&cli.nets, &blocks).context("parsing nets")?;
    let reqs = match &cli.alignments {
        Some(path) => io::parse_alignments(path, &blocks).context("parsing alignments")?,
        None => Vec::new(),
    };
    info!(
        "loaded {} blocks, {} nets, {} alignment requirements",
        blocks.len(),
        nets.len(),
        reqs.len()
    );

    let mut stack = DieStack::new(config.layers, reqs);
    let mut rng = Rng::seeded(config.seed);
    stack.init_random(&blocks, &mut rng);
    tracing::debug!("initial assignment: {}", stack.occupancy_string());

    let mut annealer = Annealer::new(config.clone());
    let outcome = annealer.run(&mut stack, &mut blocks, &mut nets);
    let report = annealer.finalize(&mut stack, &mut blocks, &mut nets, start.elapsed());

    if report.valid {
        info!("floorplanning successful, best cost {}", outcome.best_cost);
    } else {
        warn!("no layout fits the fixed outline; emitting the best-effort layout");
    }
    for line in report.to_string().lines() {
        info!("{line}");
    }

    // Output failures are logged but never change the exit code.
    if let Err(e) = io::write_results(&cli.benchmark, &report) {
        error!("writing results failed: {e}");
    }
    if let Err(e) = io::write_plots(&cli.benchmark, &config, &stack, &blocks) {
        error!("writing plots failed: {e}");
    }
    if let Some(path) = &cli.solution {
        if let Err(e) = io::write_solution(path, &stack, &blocks) {
            error!("writing the solution file failed: {e}");
        }
    }

    Ok(())
}
