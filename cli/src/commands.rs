pub mod run;
pub mod validate;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Args, Parser, Subcommand, ValueEnum};
use probeflow_common::config::{ChecksumMode, EngineConfig};
use probeflow_core::graph::Graph;

#[derive(Parser)]
#[command(name = "probeflow")]
#[command(about = "Runs network probing workflows.", version)]
pub struct CommandLine {
    /// Show debug logs (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Execute a workflow graph
    #[command(alias = "r")]
    Run(RunArgs),
    /// Check a workflow graph and print its execution waves
    #[command(alias = "v")]
    Validate(ValidateArgs),
}

#[derive(Args)]
pub struct RunArgs {
    /// Path to the graph JSON document
    pub graph: PathBuf,

    /// Network interface to transmit on
    #[arg(short, long)]
    pub interface: String,

    /// Who computes ICMPv6 checksums
    #[arg(long, value_enum, default_value_t = ChecksumArg::Transmitter)]
    pub checksum: ChecksumArg,

    /// Reject unknown step types before running
    #[arg(long)]
    pub strict: bool,

    /// Print events as JSON lines instead of text
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// Path to the graph JSON document
    pub graph: PathBuf,

    /// Reject unknown step types
    #[arg(long)]
    pub strict: bool,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChecksumArg {
    Transmitter,
    Builder,
}

impl From<ChecksumArg> for ChecksumMode {
    fn from(arg: ChecksumArg) -> Self {
        match arg {
            ChecksumArg::Transmitter => ChecksumMode::Transmitter,
            ChecksumArg::Builder => ChecksumMode::Builder,
        }
    }
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl RunArgs {
    pub fn config(&self) -> EngineConfig {
        EngineConfig {
            checksum_mode: self.checksum.into(),
            strict_step_types: self.strict,
        }
    }
}

pub fn load_graph(path: &Path) -> anyhow::Result<Graph> {
    let contents = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let graph = contents
        .parse::<Graph>()
        .with_context(|| format!("parsing {}", path.display()))?;
    Ok(graph)
}

// ╔════════════════════════════════════════════╗
// ║ ████████╗███████╗███████╗████████╗███████╗ ║
// ║ ╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔════╝ ║
// ║    ██║   █████╗  ███████╗   ██║   ███████╗ ║
// ║    ██║   ██╔══╝  ╚════██║   ██║   ╚════██║ ║
// ║    ██║   ███████╗███████║   ██║   ███████║ ║
// ║    ╚═╝   ╚══════╝╚══════╝   ╚═╝   ╚══════╝ ║
// ╚════════════════════════════════════════════╝
