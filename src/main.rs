use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use snail_race_lib::game_server::RunnerConfig;
use snail_race_lib::{run_headless, RaceConfig, RaceSetup};
use tracing_subscriber::EnvFilter;

/// Run a seeded snail race headless and print the finishers.
#[derive(Parser, Debug)]
#[command(name = "snail-race", version, about)]
struct Cli {
    /// Setup document (JSON) from the configuration screen
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Race length in seconds
    #[arg(short, long, default_value_t = 30.0)]
    length: f64,

    /// Seed string; omit for a random race
    #[arg(short, long)]
    seed: Option<String>,

    /// Runner as NAME or NAME:#rrggbb, repeatable
    #[arg(short, long = "runner")]
    runners: Vec<String>,

    /// Race name
    #[arg(long)]
    name: Option<String>,

    /// Race sponsor
    #[arg(long)]
    sponsor: Option<String>,

    /// Simulated frames per second
    #[arg(long, default_value_t = 60.0)]
    fps: f64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

fn parse_runner(spec: &str, number: u32) -> RunnerConfig {
    let (name, color) = spec.split_once(':').unwrap_or((spec, "#000000"));
    let name = if name.is_empty() {
        format!("Snail {number}")
    } else {
        name.to_string()
    };
    RunnerConfig::new(name, color, number)
}

fn build_config(cli: &Cli) -> Result<RaceConfig> {
    let mut config = match &cli.config {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            RaceSetup::from_json(&json)?.into_config()
        }
        // A bare invocation still races one snail
        None => RaceConfig {
            runners: vec![parse_runner("", 1)],
            length_seconds: cli.length,
            ..Default::default()
        },
    };

    if !cli.runners.is_empty() {
        config.runners = cli
            .runners
            .iter()
            .enumerate()
            .map(|(i, spec)| parse_runner(spec, i as u32 + 1))
            .collect();
    }
    if cli.seed.is_some() {
        config.seed = cli.seed.clone();
    }
    if cli.name.is_some() {
        config.name = cli.name.clone();
    }
    if cli.sponsor.is_some() {
        config.sponsor = cli.sponsor.clone();
    }
    Ok(config)
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = build_config(&cli)?;

    let report = run_headless(config, cli.fps, |report| {
        log::info!("Completion callback: {} finishers", report.finishers.len());
    })?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    if let Some(name) = &report.name {
        println!("{name}");
    }
    if let Some(sponsor) = &report.sponsor {
        println!("Sponsored by {sponsor}");
    }
    println!("Seed: {}", report.seed);
    for (place, finisher) in report.standings().iter().enumerate() {
        println!(
            "{}: {} (#{}) {}",
            place + 1,
            finisher.runner.name,
            finisher.runner.number,
            finisher.formatted_time()
        );
    }
    Ok(())
}
