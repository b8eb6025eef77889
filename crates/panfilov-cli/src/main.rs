//! # Panfilov CLI
//!
//! Command-line driver for the Aliev-Panfilov 0D simulator.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use colored::Colorize;
use panfilov_core::time_axis;
use panfilov_zero_d::{protocols, AlievPanfilov0D, Parameters, Stimulation};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "panfilov")]
#[command(author = "Yatrogenesis")]
#[command(version = "0.1.0")]
#[command(about = "Aliev-Panfilov 0D cardiac excitation simulator", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a simulation and print a summary of the trace
    Run {
        /// Time step (ms)
        #[arg(long, default_value_t = 0.01)]
        dt: f64,

        /// Maximum simulated time (ms)
        #[arg(long, default_value_t = 100.0)]
        t_max: f64,

        /// Stimulus pulse as "t_start,duration,amplitude" (repeatable)
        #[arg(short, long = "stim", value_name = "T_START,DUR,AMP")]
        stimuli: Vec<String>,

        /// Built-in protocol (used when no --stim is given)
        #[arg(long, default_value = "paced")]
        protocol: String,

        /// JSON file with parameter overrides, e.g. {"k": 10.0}
        #[arg(long)]
        params: Option<PathBuf>,
    },

    /// List built-in stimulation protocols
    Protocols,
}

fn parse_stimulation(s: &str) -> anyhow::Result<Stimulation> {
    let fields: Vec<&str> = s.split(',').collect();
    if fields.len() != 3 {
        bail!("expected t_start,duration,amplitude, got '{s}'");
    }
    let parse = |f: &str| {
        f.trim()
            .parse::<f64>()
            .with_context(|| format!("invalid number '{f}' in stimulus '{s}'"))
    };
    Ok(Stimulation::new(
        parse(fields[0])?,
        parse(fields[1])?,
        parse(fields[2])?,
    ))
}

fn protocol_by_name(name: &str) -> anyhow::Result<Vec<Stimulation>> {
    match name {
        "single-pulse" => Ok(protocols::single_pulse()),
        "paced" => Ok(protocols::paced()),
        other => bail!("unknown protocol '{other}' (see `panfilov protocols`)"),
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            dt,
            t_max,
            stimuli,
            protocol,
            params,
        } => {
            let stimulations = if stimuli.is_empty() {
                protocol_by_name(&protocol)?
            } else {
                stimuli
                    .iter()
                    .map(|s| parse_stimulation(s))
                    .collect::<anyhow::Result<Vec<_>>>()?
            };

            let mut sim = AlievPanfilov0D::new(dt, stimulations)?;
            if let Some(path) = params {
                let text = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?;
                let overrides: Parameters = serde_json::from_str(&text)
                    .with_context(|| format!("parsing {}", path.display()))?;
                sim = sim.with_parameters(overrides);
            }

            println!(
                "{} dt = {} ms, t_max = {} ms",
                "Running Aliev-Panfilov 0D:".green().bold(),
                dt,
                t_max
            );
            sim.run(t_max)?;

            let time = time_axis(t_max, dt);
            let history = sim.history();
            println!("  Steps recorded: {}", history.len().to_string().cyan());

            if let Some((i, peak)) = history
                .u
                .values
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
            {
                println!(
                    "  Peak u: {} at t = {} ms",
                    format!("{peak:.4}").cyan(),
                    format!("{:.2}", time[i]).cyan()
                );
            }

            let state = sim.state();
            println!(
                "  Final state: u = {}, v = {}",
                format!("{:.4}", state.u).cyan(),
                format!("{:.4}", state.v).cyan()
            );
        }

        Commands::Protocols => {
            println!("{}", "Built-in stimulation protocols:".green().bold());
            println!();
            println!(
                "  {} - one pulse (t_start=0, duration=0.1, amplitude=2)",
                "single-pulse".cyan()
            );
            println!(
                "  {} - three pulses at t = 0, 40, 70 ms",
                "paced".cyan()
            );
        }
    }

    Ok(())
}
