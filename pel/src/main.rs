//! `pel`: a thin CLI around the [`pel`] library — compile `.pel` source to
//! JSON IR, or compile and run a model's simulation.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use pel::driver::{compile, CompileOptions};
use pel::runtime::{run_deterministic, run_monte_carlo, RuntimeConfig, RuntimeMode};
use std::fs;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "pel", version, about = "Compiler and runtime for the Programmable Economic Language")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compile a `.pel` file to JSON IR.
    Compile {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(short, long)]
        verbose: bool,
        /// Emit IR even if the checker reported diagnostics.
        #[arg(long)]
        force: bool,
    },
    /// Compile and simulate a `.pel` file.
    Run {
        input: PathBuf,
        #[arg(short, long)]
        verbose: bool,
        #[arg(long, value_enum, default_value_t = Mode::Deterministic)]
        mode: Mode,
        #[arg(long, default_value_t = 42)]
        seed: u64,
        #[arg(long, default_value_t = 1000)]
        num_runs: usize,
        #[arg(long, default_value_t = 10_000)]
        max_runs: usize,
        #[arg(long, default_value_t = 12)]
        time_horizon: usize,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum Mode {
    Deterministic,
    MonteCarlo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Compile { input, output, verbose, force } => compile_cmd(input, output, verbose, force),
        Command::Run { input, verbose, mode, seed, num_runs, max_runs, time_horizon } => {
            run_cmd(input, verbose, mode, seed, num_runs, max_runs, time_horizon)
        }
    }
}

fn compile_cmd(input: PathBuf, output: Option<PathBuf>, verbose: bool, force: bool) -> Result<()> {
    let source = fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
    let filename = input.to_string_lossy().to_string();
    let options = CompileOptions { verbose, force };

    let out = compile(&source, &filename, &options).map_err(|d| anyhow::anyhow!("{d}"))?;

    for d in &out.diagnostics {
        eprintln!("{d}");
    }
    eprintln!("provenance completeness: {:.0}%", out.provenance_score * 100.0);

    let Some(ir) = out.ir else {
        bail!("compilation produced diagnostics; rerun with --force to emit IR anyway");
    };
    let json = serde_json::to_string_pretty(&ir)?;
    match output {
        Some(path) => fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?,
        None => println!("{json}"),
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_cmd(
    input: PathBuf,
    verbose: bool,
    mode: Mode,
    seed: u64,
    num_runs: usize,
    max_runs: usize,
    time_horizon: usize,
) -> Result<()> {
    let source = fs::read_to_string(&input).with_context(|| format!("reading {}", input.display()))?;
    let filename = input.to_string_lossy().to_string();
    let options = CompileOptions { verbose, force: false };

    let out = compile(&source, &filename, &options).map_err(|d| anyhow::anyhow!("{d}"))?;
    for d in &out.diagnostics {
        eprintln!("{d}");
    }
    let ir = out.ir.context("compilation produced diagnostics; fix them before running")?;

    let config = RuntimeConfig {
        mode: match mode {
            Mode::Deterministic => RuntimeMode::Deterministic,
            Mode::MonteCarlo => RuntimeMode::MonteCarlo,
        },
        seed,
        num_runs,
        max_runs,
        time_horizon,
    };

    match config.mode {
        RuntimeMode::Deterministic => {
            let result = run_deterministic(&ir, &config).map_err(|d| anyhow::anyhow!("{d}"))?;
            for w in &result.warnings {
                eprintln!("warning: {}", w.message);
            }
            let mut names: Vec<&String> = result.series.keys().collect();
            names.sort();
            for name in names {
                println!("{name}: {:?}", result.series[name]);
            }
            for c in &result.constraints {
                if !c.passed {
                    eprintln!("constraint '{}' failed at t={} ({})", c.name, c.step, c.severity);
                }
            }
        }
        RuntimeMode::MonteCarlo => {
            let result = run_monte_carlo(&ir, &config).map_err(|d| anyhow::anyhow!("{d}"))?;
            for w in &result.warnings {
                eprintln!("warning: {}", w.message);
            }
            let mut names: Vec<&String> = result.summary.keys().collect();
            names.sort();
            for name in names {
                let s = &result.summary[name];
                println!("{name}: mean={:?} stddev={:?}", s.mean, s.stddev);
            }
        }
    }
    Ok(())
}
