// SPDX-License-Identifier: MIT
//
// QKD Simulator: BB84 and E91 Key Distribution Engine
// Copyright (c) 2025 Valer Bocan, PhD, CSSLP
// Email: valer.bocan@upt.ro
//
// Department of Computer and Information Technology
// Politehnica University of Timisoara

//! QKD Simulator - Command-line driver
//!
//! Runs BB84 or E91 sessions through the simulation engine and reports the exchanged
//! bases, the matching indices and the averaged sifted key length.
//!
//! # Configuration
//!
//! Settings come from a configuration file (`--config`) or from `QKD_*` environment
//! variables, and any command-line flag overrides both. Logs go to stderr so stdout
//! carries only the report.

mod report;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use qkd_core::{BackendKind, ProtocolKind, SimulationConfig, SimulationReport, Simulator};
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Yaml,
}

#[derive(Parser, Debug)]
#[command(name = "qkd-sim")]
#[command(about = "QKD Simulator - Runs BB84 and E91 key distribution sessions", long_about = None)]
struct Args {
    /// Configuration file (YAML, TOML or JSON); QKD_* environment variables when absent
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Protocol family (bb84, e91)
    #[arg(short, long)]
    protocol: Option<ProtocolKind>,

    /// Units (photons or entangled pairs) per session
    #[arg(short = 'n', long)]
    length: Option<usize>,

    /// Number of independent sessions to average over
    #[arg(short, long)]
    trials: Option<usize>,

    /// Fixed seed for a reproducible run
    #[arg(short, long)]
    seed: Option<u64>,

    /// Measurement backend (ideal, statevector)
    #[arg(short, long)]
    backend: Option<BackendKind>,

    /// Print the sifted keys in the text report
    #[arg(long)]
    show_keys: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,

    /// Print Prometheus-format run metrics after the report
    #[arg(long)]
    metrics: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Args {
    /// Load the base configuration and apply command-line overrides
    fn load_config(&self) -> Result<SimulationConfig> {
        let mut config = match &self.config {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                SimulationConfig::from_file(path)
                    .with_context(|| format!("Failed to load configuration from {}", path.display()))?
            }
            None => SimulationConfig::from_env()
                .context("Failed to load configuration from environment")?,
        };

        if let Some(protocol) = self.protocol {
            config.protocol = protocol;
        }
        if let Some(length) = self.length {
            config.length = length;
        }
        if let Some(trials) = self.trials {
            config.trials = trials;
        }
        if let Some(seed) = self.seed {
            config.seed = Some(seed);
        }
        if let Some(backend) = self.backend {
            config.backend = backend;
        }

        Ok(config)
    }
}

fn render(report: &SimulationReport, format: OutputFormat, show_keys: bool) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(report::render_text(report, show_keys)),
        OutputFormat::Json => {
            let mut json =
                serde_json::to_string_pretty(report).context("Failed to serialize report")?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Yaml => serde_yaml::to_string(report).context("Failed to serialize report"),
    }
}

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    // Initialize tracing
    let log_level = args
        .log_level
        .parse::<tracing::Level>()
        .unwrap_or(tracing::Level::INFO);

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .with_writer(std::io::stderr);
    if args.log_json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("QKD Simulator v{}", qkd_core::VERSION);

    let config = args.load_config()?;
    let simulator = Simulator::new(config).context("Invalid simulation configuration")?;
    let report = simulator.run().context("Simulation failed")?;

    print!("{}", render(&report, args.format, args.show_keys)?);
    if args.metrics {
        print!("{}", simulator.metrics().prometheus_format());
    }

    Ok(())
}
