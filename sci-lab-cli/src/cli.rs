//! CLI argument parsing

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::commands::{
    bench::BenchCommand, classify::ClassifyCommand, investigate::InvestigateCommand, simulate::SimulateCommand,
};
use crate::output::OutputFormat;

/// Scientific Investigation Lab CLI
///
/// Answers a scientific question by forming a hypothesis, simulating an
/// experiment and reconciling the two into a verdict.
#[derive(Parser, Debug)]
#[command(name = "sci-lab")]
#[command(version)]
#[command(about = "Scripted scientific investigations", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (table, json, yaml)
    #[arg(short, long, global = true, value_enum, default_value = "table", env = "SCI_LAB_OUTPUT")]
    pub output: OutputFormat,

    /// Investigation config file (TOML)
    #[arg(short, long, global = true, env = "SCI_LAB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Use the built-in offline language model instead of the remote one
    #[arg(long, global = true)]
    pub offline: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a full investigation of a question
    #[command(alias = "run")]
    Investigate(InvestigateCommand),

    /// Show which domain a question is routed to
    Classify(ClassifyCommand),

    /// Simulate an experiment for a domain's default model
    #[command(alias = "sim")]
    Simulate(SimulateCommand),

    /// List domains with their experiment defaults
    Domains,

    /// Time offline investigations across every domain
    Bench(BenchCommand),
}
