//! Scientific Investigation Lab CLI
//!
//! Command-line interface for running investigations, classifying
//! questions and exercising the simulation engine.
//!
//! Exit codes: 0 on success, 2 when an investigation stage fails, 1 on any
//! other error.

use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod context;
mod output;
mod plot;

use cli::{Cli, Commands};
use context::Context;
use sci_lab_agents::WorkflowError;

fn init_tracing(verbose: bool) -> anyhow::Result<()> {
    let default_level = if verbose { "sci_lab_agents=debug" } else { "sci_lab_agents=warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(default_level.parse()?)
                .add_directive("warn".parse()?),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();
    Ok(())
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let ctx = Context::new(&cli)?;

    match cli.command {
        Commands::Investigate(cmd) => commands::investigate::execute(&ctx, cmd).await,
        Commands::Classify(cmd) => commands::classify::execute(&ctx, cmd).await,
        Commands::Simulate(cmd) => commands::simulate::execute(&ctx, cmd).await,
        Commands::Domains => commands::domains::execute(&ctx).await,
        Commands::Bench(cmd) => commands::bench::execute(&ctx, cmd).await,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Failed to initialize logging: {:#}", e);
        return ExitCode::from(1);
    }

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) if err.downcast_ref::<WorkflowError>().is_some() => ExitCode::from(2),
        Err(err) => {
            eprintln!("Error: {:#}", err);
            ExitCode::from(1)
        }
    }
}
