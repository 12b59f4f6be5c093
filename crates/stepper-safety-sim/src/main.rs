//! stepper-safety-sim - replay fault scenarios against the safety core.

#![deny(clippy::unwrap_used)]

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use stepper_safety::SafetyConfig;
use stepper_safety_sim::{Scenario, ScenarioReport};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "stepper-safety-sim")]
#[command(about = "Replay fault scenarios against the stepper safety core")]
#[command(version)]
struct Cli {
    /// Output in JSON format for machine parsing
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging (repeat for more)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Safety configuration overrides as a JSON file
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario
    Run {
        /// Scenario to run
        #[arg(value_enum)]
        scenario: Scenario,
    },

    /// Run every scenario in order
    All,

    /// List the available scenarios
    List,

    /// Print the effective configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let config = load_config(cli.config.as_deref())?;
    execute(&cli, &config)
}

fn load_config(path: Option<&Path>) -> Result<SafetyConfig> {
    let Some(path) = path else {
        return Ok(SafetyConfig::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("reading configuration {}", path.display()))?;
    let config: SafetyConfig = serde_json::from_str(&text)
        .with_context(|| format!("parsing configuration {}", path.display()))?;
    config
        .validate()
        .with_context(|| format!("validating configuration {}", path.display()))?;
    tracing::info!(path = %path.display(), "configuration loaded");
    Ok(config)
}

fn execute(cli: &Cli, config: &SafetyConfig) -> Result<()> {
    match &cli.command {
        Commands::Run { scenario } => {
            let report = stepper_safety_sim::run(*scenario, config)
                .with_context(|| format!("scenario {scenario} failed"))?;
            print_reports(&[report], cli.json)
        }
        Commands::All => {
            let reports = stepper_safety_sim::run_all(config).context("scenario run failed")?;
            print_reports(&reports, cli.json)
        }
        Commands::List => print_list(cli.json),
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(config)?);
            Ok(())
        }
    }
}

fn print_reports(reports: &[ScenarioReport], json: bool) -> Result<()> {
    if json {
        let output = match reports {
            [report] => serde_json::to_value(report)?,
            _ => serde_json::to_value(reports)?,
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }
    for (index, report) in reports.iter().enumerate() {
        if index > 0 {
            println!();
        }
        print!("{report}");
    }
    Ok(())
}

fn print_list(json: bool) -> Result<()> {
    if json {
        let scenarios: Vec<_> = Scenario::ALL
            .iter()
            .map(|scenario| {
                json!({
                    "name": scenario.name(),
                    "summary": scenario.summary(),
                    "expected_final_state": scenario.expected_final_state(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&scenarios)?);
        return Ok(());
    }
    for scenario in Scenario::ALL {
        println!("{:<22} {}", scenario.name(), scenario.summary());
    }
    Ok(())
}
