//! redstone-inspect: print the consensus rules a deployment resolves to.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use serde::Serialize;

use redstone_consensus::ConsensusResolver;
use redstone_types::{ChainParams, DifficultySample, Height, NetworkId};
use redstone_utils::{init_logging, LogFormat};

#[derive(Parser)]
#[command(name = "redstone-inspect", about = "Inspect Redstones consensus rules")]
struct Cli {
    /// Network preset: "live", "test" or "dev". Ignored when --config is given.
    #[arg(long, default_value = "live", env = "REDSTONE_NETWORK")]
    network: String,

    /// Path to a TOML `ChainParams` file to use instead of a preset.
    #[arg(long, env = "REDSTONE_CONFIG")]
    config: Option<PathBuf>,

    /// Log level: "trace", "debug", "info", "warn", "error".
    #[arg(long, default_value = "warn", env = "REDSTONE_LOG_LEVEL")]
    log_level: String,

    /// Log format: "human" or "json".
    #[arg(long, default_value = "human", env = "REDSTONE_LOG_FORMAT")]
    log_format: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Print the rule set in force at a height.
    Rules {
        #[arg(long)]
        height: Height,
    },
    /// Print every row of the rule table.
    Table,
    /// Print the major-version schedule and software fork heights.
    Schedule,
    /// Resolve a range of heights against a difficulty history.
    Resolve {
        #[arg(long)]
        from: Height,
        #[arg(long)]
        to: Height,
        #[arg(long, default_value_t = 1)]
        step: u64,
        /// JSON array of `{timestamp, cumulative_difficulty}` samples, oldest
        /// first. Without it a steady history at `--difficulty` is used.
        #[arg(long)]
        history: Option<PathBuf>,
        #[arg(long, default_value_t = 1_000)]
        difficulty: u64,
    },
    /// Report whether this build has fallen behind its peers.
    Behind {
        #[arg(long)]
        height: Height,
        #[arg(long)]
        peer_fork_index: usize,
    },
    /// Print the effective parameters as TOML.
    DumpConfig,
}

#[derive(Serialize)]
struct ScheduleReport {
    network: NetworkId,
    activations: Vec<(u8, Height)>,
    software_fork_heights: Vec<Height>,
    supported_fork_index: usize,
    rule_rows: usize,
}

#[derive(Serialize)]
struct BehindReport {
    height: Height,
    voted_fork_index: usize,
    supported_fork_index: usize,
    behind: bool,
    blocks_until_next_fork: Option<u64>,
}

fn load_params(cli: &Cli) -> anyhow::Result<ChainParams> {
    match &cli.config {
        Some(path) => {
            let params = ChainParams::from_toml_file(path)
                .with_context(|| format!("loading {}", path.display()))?;
            tracing::info!(path = %path.display(), network = %params.network, "loaded chain params");
            Ok(params)
        }
        None => {
            let network: NetworkId = cli.network.parse()?;
            Ok(ChainParams::for_network(network))
        }
    }
}

fn load_history(path: &Path) -> anyhow::Result<Vec<DifficultySample>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

/// A history of `count` blocks solved exactly on target.
fn steady_history(count: usize, difficulty: u64, target: u64) -> Vec<DifficultySample> {
    (0..count as u64)
        .map(|i| {
            DifficultySample::new(
                i * target,
                u128::from(difficulty) * u128::from(i + 1),
            )
        })
        .collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.parse()?;
    init_logging(log_format, &cli.log_level)?;

    let params = load_params(&cli)?;
    let resolver = ConsensusResolver::new(params)?;

    match cli.command {
        Command::Rules { height } => print_json(resolver.rule_set_at(height)?),
        Command::Table => print_json(&resolver.table().rows()),
        Command::Schedule => {
            let schedule = resolver.schedule();
            let activations = schedule
                .activation_heights()
                .map(|h| (schedule.version_at(h), h))
                .collect();
            print_json(&ScheduleReport {
                network: resolver.params().network,
                activations,
                software_fork_heights: resolver.software().fork_heights().to_vec(),
                supported_fork_index: resolver.software().current_fork_index(),
                rule_rows: resolver.table().len(),
            })
        }
        Command::Resolve {
            from,
            to,
            step,
            history,
            difficulty,
        } => {
            anyhow::ensure!(from <= to, "--from must not exceed --to");
            let samples = match history {
                Some(path) => load_history(&path)?,
                None => {
                    let target = resolver.params().difficulty.target_secs;
                    let needed = resolver
                        .table()
                        .rows()
                        .iter()
                        .map(|r| r.difficulty_blocks_count())
                        .max()
                        .unwrap_or(2);
                    steady_history(needed, difficulty, target)
                }
            };
            let votes = resolver.new_vote_window();
            let mut resolutions = Vec::new();
            let mut height = from;
            while height <= to {
                resolutions.push(resolver.resolve(height, &votes, &samples)?);
                match height.checked_add(step.max(1)) {
                    Some(next) => height = next,
                    None => break,
                }
            }
            print_json(&resolutions)
        }
        Command::Behind {
            height,
            peer_fork_index,
        } => {
            let software = resolver.software();
            print_json(&BehindReport {
                height,
                voted_fork_index: software.voted_fork_index(height),
                supported_fork_index: software.current_fork_index(),
                behind: software.is_software_behind(height, peer_fork_index),
                blocks_until_next_fork: software.blocks_until_next_fork(height),
            })
        }
        Command::DumpConfig => {
            print!("{}", resolver.params().to_toml_string()?);
            Ok(())
        }
    }
}
