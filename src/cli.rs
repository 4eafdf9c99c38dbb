//! Command-line interface definition.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::Override;

/// Top-level CLI entry point for inspecting layered configuration.
#[derive(Parser, Debug)]
#[command(
    name = "layered-opts",
    about = "Inspect copy-on-write layered configuration views",
    version
)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the effective configuration of an override layer as JSON
    Show(ShowOpts),
    /// Print mutation and memory diagnostics of an override layer as JSON
    Report(ReportOpts),
    /// Print version information
    Version,
}

/// Source file and overrides shared by `show` and `report`.
#[derive(Parser, Debug, Clone)]
pub struct LayerOpts {
    /// Source configuration file (.toml or .json)
    pub file: PathBuf,

    /// Override a key on the child layer (repeatable), e.g. `grains.os=Arch`
    #[arg(short = 's', long = "set", value_name = "KEY=VALUE")]
    pub overrides: Vec<Override>,

    /// Name of the child layer that receives the overrides
    #[arg(short, long, default_value = "cli")]
    pub layer: String,
}

/// Options for the `show` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ShowOpts {
    /// Source and overrides.
    #[command(flatten)]
    pub layer: LayerOpts,
}

/// Options for the `report` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct ReportOpts {
    /// Source and overrides.
    #[command(flatten)]
    pub layer: LayerOpts,

    /// Include full value history and every call site per key
    #[arg(long)]
    pub verbose_report: bool,

    /// Only list hotspot keys mutated at least this many times
    #[arg(long, default_value_t = 2)]
    pub min_mutations: usize,
}
