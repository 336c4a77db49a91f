//! Headless harness: runs a ship for a fixed span of simulated time and
//! prints every event as a JSON line.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use derelict_app::config::AppConfig;
use derelict_app::game_loop::hibernate;
use derelict_app::persistence::{self, SaveData};
use derelict_app::state::{lock, new_session};
use derelict_sim::SimulationEngine;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Headless DERELICT runner
#[derive(Parser, Debug)]
#[command(name = "derelict-headless")]
#[command(about = "Advance a derelict ship headlessly and stream its events as JSON")]
struct Args {
    /// TOML config file (defaults apply when omitted)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Simulated seconds to run
    #[arg(long, default_value_t = 3600)]
    seconds: u64,

    /// Seed override for a new ship
    #[arg(long)]
    seed: Option<u64>,

    /// Save slot: resumed if it exists, written back when the run ends
    #[arg(long)]
    save: Option<String>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => match AppConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("failed to load {}: {e}", path.display());
                return ExitCode::FAILURE;
            }
        },
        None => AppConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.seed = seed;
    }

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(&args, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "run failed");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: &AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let engine = match &args.save {
        Some(slot) if config.save_dir.join(format!("{slot}.json")).exists() => {
            info!(slot, "resuming save");
            persistence::load_from_file(&config.save_dir, slot)?.into_engine()
        }
        _ => SimulationEngine::new(config.sim_config()),
    };
    let session = new_session(engine);

    let report = hibernate(&session, args.seconds, config.hibernate_chunk_s, |_| false);
    for event in &report.events {
        println!("{}", serde_json::to_string(event)?);
    }

    let engine = lock(&session);
    let state = engine.state();
    info!(
        elapsed_s = state.clock.elapsed_s,
        events = report.events.len(),
        soc = state.power.state_of_charge(),
        terminal_lock = state.terminal_lock,
        "run complete"
    );

    if let Some(slot) = &args.save {
        persistence::save_to_file(&config.save_dir, slot, &SaveData::capture(slot, &engine))?;
    }
    Ok(())
}
