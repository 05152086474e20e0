//! Shellback CLI: validate configs and replay engine cycles against the
//! simulated broker.
//!
//! Commands:
//! - `run`: execute N cycles from a TOML config (simulated broker; a live
//!   broker adapter plugs in through the `Broker` trait, not this binary)
//! - `check-config`: load, validate, and echo a config file

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use shellback_runner::logging::init_logging;
use shellback_runner::runner::run_cycle;
use shellback_runner::sim::SimBroker;
use shellback_runner::RunConfig;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "shellback",
    about = "Shellback, a turtle-style bracket order engine"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run cycles from a TOML config against the simulated broker.
    Run {
        /// Path to a TOML config file. Defaults ship the original pairs.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Number of cycles to run.
        #[arg(long, default_value_t = 1)]
        cycles: u32,

        /// Price overrides applied before the first cycle, PAIR=PRICE.
        #[arg(long, value_name = "PAIR=PRICE")]
        price: Vec<String>,
    },
    /// Load and validate a config file.
    CheckConfig {
        #[arg(long)]
        config: PathBuf,
    },
}

fn load_config(path: Option<&PathBuf>) -> Result<RunConfig> {
    match path {
        Some(p) => {
            RunConfig::load(p).with_context(|| format!("loading config {}", p.display()))
        }
        None => Ok(RunConfig::default()),
    }
}

fn parse_price_override(raw: &str) -> Result<(String, f64)> {
    let (pair, price) = raw
        .split_once('=')
        .with_context(|| format!("expected PAIR=PRICE, got {raw}"))?;
    let price: f64 = price
        .parse()
        .with_context(|| format!("bad price in override {raw}"))?;
    Ok((pair.to_string(), price))
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run { config, cycles, price } => {
            let config = load_config(config.as_ref())?;
            let _guard = init_logging(&config.log.level, config.log.dir.as_deref());

            let mut broker = SimBroker::from_config(&config);
            for raw in &price {
                let (pair, px) = parse_price_override(raw)?;
                broker.set_price(&pair, px);
            }

            for cycle in 1..=cycles {
                let report = run_cycle(&mut broker, &config);
                println!(
                    "cycle {cycle}: submitted {} orders, cancelled {}, {} failures",
                    report.orders_submitted(),
                    report.orders_cancelled(),
                    report.failures(),
                );
                for result in &report.results {
                    match &result.result {
                        Ok(outcome) => println!(
                            "  {}: {:?}, {} orders out",
                            result.pair,
                            outcome.state,
                            outcome.submitted.len()
                        ),
                        Err(err) => println!("  {}: skipped ({err})", result.pair),
                    }
                }
            }
            Ok(())
        }
        Commands::CheckConfig { config } => {
            let loaded = RunConfig::load(&config)
                .with_context(|| format!("loading config {}", config.display()))?;
            println!(
                "ok: {} instruments, risk {:.2}% per entry, unit ceiling {:.2}%",
                loaded.instruments.len(),
                loaded.strategy.risk_fraction * 100.0,
                loaded.strategy.unit_risk_fraction * 100.0,
            );
            for inst in &loaded.instruments {
                println!("  {} tick {}", inst.pair, inst.increment);
            }
            Ok(())
        }
    }
}
