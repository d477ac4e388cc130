use clap::{Parser, Subcommand};
use color_eyre::eyre::WrapErr;
use color_eyre::Result;
use env_logger::Env;
use log::{info, warn};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use netsim::codec::{deserialize, serialize};
use netsim::config_loader::{build_topology, load_scenario, scenario_log_level};
use netsim::generator::{generate, GeneratorParams};
use netsim::report::TopologyReport;
use netsim::topology::Topology;

/// Build, check and canonicalize segmented network topologies
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log filter used when RUST_LOG is not set [default: scenario level, then info]
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a topology from a YAML scenario and emit its canonical text
    Build {
        scenario: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Parse a topology file and re-emit it in canonical form
    Canonicalize {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Report loop status; exits non-zero when any segment has loops
    Check { input: PathBuf },
    /// Break every same-segment loop and emit the result
    FixLoops {
        input: PathBuf,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Print a summary of a topology file
    Inspect {
        input: PathBuf,
        #[arg(long)]
        json: bool,
    },
    /// Emit a seeded random topology
    Generate {
        #[arg(long)]
        seed: u64,
        #[arg(long, default_value_t = 3)]
        segments: usize,
        /// Nodes per segment
        #[arg(long, default_value_t = 6)]
        nodes: usize,
        /// Connection attempts
        #[arg(long, default_value_t = 12)]
        links: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<ExitCode> {
    // Initialize error handling
    color_eyre::install()?;

    let args = Args::parse();

    let level = log_filter(&args);
    env_logger::Builder::from_env(Env::default().default_filter_or(level)).init();

    run(args.command)
}

fn run(command: Command) -> Result<ExitCode> {
    match command {
        Command::Build { scenario, output } => {
            let scenario = load_scenario(&scenario)?;
            let topology = build_topology(&scenario)?;
            emit(&topology, output.as_deref())?;
        }
        Command::Canonicalize { input, output } => {
            let topology = read_topology(&input)?;
            emit(&topology, output.as_deref())?;
        }
        Command::Check { input } => {
            if report_loops(&read_topology(&input)?) {
                println!("loops found");
                return Ok(ExitCode::FAILURE);
            }
            println!("no loops");
        }
        Command::FixLoops { input, output } => {
            let mut topology = read_topology(&input)?;
            let removed = topology.fix_loops();
            info!("Removed {} edges", removed);
            emit(&topology, output.as_deref())?;
        }
        Command::Inspect { input, json } => {
            let report = TopologyReport::from_topology(&read_topology(&input)?);
            if json {
                println!("{}", report.to_json()?);
            } else {
                print!("{}", report.to_text());
            }
        }
        Command::Generate {
            seed,
            segments,
            nodes,
            links,
            output,
        } => {
            let params = GeneratorParams {
                seed,
                segments,
                nodes,
                links,
                ..Default::default()
            };
            emit(&generate(&params), output.as_deref())?;
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Default log filter: the flag, then the level of the scenario being built.
fn log_filter(args: &Args) -> String {
    if let Some(level) = &args.log_level {
        return level.clone();
    }
    let scenario_level = match &args.command {
        Command::Build { scenario, .. } => scenario_log_level(scenario),
        _ => None,
    };
    scenario_level.unwrap_or_else(|| "info".to_string())
}

/// Log every segment with loops; returns true if there was one.
fn report_loops(topology: &Topology) -> bool {
    let mut loops = false;
    for (i, segment) in topology.segments().enumerate() {
        if segment.has_loops() {
            warn!("Segment {} contains loops", i);
            loops = true;
        }
    }
    loops
}

fn read_topology(path: &Path) -> Result<Topology> {
    info!("Reading topology from: {:?}", path);
    let text = fs::read_to_string(path).wrap_err_with(|| format!("Failed to read '{}'", path.display()))?;
    deserialize(&text).wrap_err_with(|| format!("Failed to parse '{}'", path.display()))
}

fn emit(topology: &Topology, output: Option<&Path>) -> Result<()> {
    let text = serialize(topology);
    match output {
        Some(path) => {
            fs::write(path, text).wrap_err_with(|| format!("Failed to write '{}'", path.display()))?;
            info!("Topology written to {:?}", path);
        }
        None => print!("{}", text),
    }
    Ok(())
}
