#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line adapter that drives a headless Dustfield session.

mod ascii;
mod config;
mod scenario;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use dustfield_core::Phase;
use tracing::level_filters::LevelFilter;

use crate::scenario::{Scenario, ScenarioOptions};

/// Phases selectable from the command line.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum PhaseArg {
    Establish,
    Evolve,
    Intensify,
    Release,
    Wildcard,
    Bridge,
    Pop,
}

impl From<PhaseArg> for Phase {
    fn from(value: PhaseArg) -> Self {
        match value {
            PhaseArg::Establish => Phase::Establish,
            PhaseArg::Evolve => Phase::Evolve,
            PhaseArg::Intensify => Phase::Intensify,
            PhaseArg::Release => Phase::Release,
            PhaseArg::Wildcard => Phase::Wildcard,
            PhaseArg::Bridge => Phase::Bridge,
            PhaseArg::Pop => Phase::Pop,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "dustfield")]
#[command(about = "Run a scripted headless session of the Dustfield terrain engine")]
struct Args {
    /// TOML file overriding the default terrain configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Phase whose pattern generator lays out the field
    #[arg(short, long, value_enum, default_value = "establish")]
    phase: PhaseArg,

    /// Grid columns
    #[arg(long, default_value = "48")]
    columns: u32,

    /// Grid rows
    #[arg(long, default_value = "24")]
    rows: u32,

    /// World seed, overriding the configured one
    #[arg(short, long)]
    seed: Option<u64>,

    /// Number of 16 ms frames to simulate
    #[arg(short, long, default_value = "600")]
    frames: u32,

    /// Frames between rhythmic steps
    #[arg(long, default_value = "8")]
    step_every: u32,

    /// Skip the ASCII dump of the final field
    #[arg(long)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

/// Entry point for the Dustfield command-line interface.
fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(args.verbose);

    let mut terrain = config::load(args.config.as_deref())?;
    if let Some(seed) = args.seed {
        terrain.seed = seed;
    }

    let options = ScenarioOptions {
        columns: args.columns,
        rows: args.rows,
        phase: args.phase.into(),
        frames: args.frames,
        step_every: args.step_every.max(1),
    };
    let mut scenario = Scenario::new(terrain, options).context("failed to set up scenario")?;
    scenario.run();

    println!("{}", scenario.summary());
    if !args.quiet {
        println!("{}", ascii::render(scenario.world()));
    }
    Ok(())
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::WARN,
        1 => LevelFilter::INFO,
        2 => LevelFilter::DEBUG,
        _ => LevelFilter::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
