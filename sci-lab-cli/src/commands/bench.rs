//! Benchmark command
//!
//! Runs the full pipeline with the offline language model for one
//! question per domain and reports wall time per investigation.

use anyhow::Result;
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

use sci_lab_agents::{Domain, OfflineLanguageModel, StaticKnowledgeBase, WorkflowCoordinator};

use crate::context::Context;
use crate::output::OutputFormat;

/// Arguments for the bench command
#[derive(Args, Debug)]
pub struct BenchCommand {
    /// Investigations per domain
    #[arg(short = 'n', long, default_value_t = 5)]
    pub iterations: usize,

    /// Restrict to these domains (comma-separated)
    #[arg(short, long, value_delimiter = ',')]
    pub domains: Option<Vec<Domain>>,
}

/// Question used to exercise each domain.
fn bench_question(domain: Domain) -> &'static str {
    match domain {
        Domain::Physics => "How does applied force affect acceleration?",
        Domain::Chemistry => "How does temperature affect chemical reaction rate?",
        Domain::Biology => "How does light intensity affect plant photosynthesis?",
        Domain::Environmental => "How does CO2 concentration affect climate warming?",
        Domain::Engineering => "How does turbine load affect efficiency?",
        Domain::Medicine => "How does drug dose affect treatment response?",
    }
}

/// Timing summary for one domain.
#[derive(Debug, Serialize)]
struct BenchResult {
    domain: Domain,
    question: &'static str,
    runs: usize,
    succeeded: usize,
    mean_ms: f64,
    std_ms: f64,
}

fn mean_std(samples: &[f64]) -> (f64, f64) {
    if samples.is_empty() {
        return (0.0, 0.0);
    }
    let n = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / n;
    let var = samples.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, var.sqrt())
}

/// Execute the bench command
pub async fn execute(ctx: &Context, cmd: BenchCommand) -> Result<()> {
    if cmd.iterations == 0 {
        anyhow::bail!("--iterations must be at least 1");
    }

    let coordinator = WorkflowCoordinator::new(
        &ctx.config,
        Arc::new(OfflineLanguageModel),
        Arc::new(StaticKnowledgeBase::new()),
    )
    .without_telemetry();

    let domains = cmd.domains.clone().unwrap_or_else(|| Domain::ALL.to_vec());
    let progress = ctx.output.progress((domains.len() * cmd.iterations) as u64);

    let mut results = Vec::with_capacity(domains.len());
    for domain in domains {
        let question = bench_question(domain);
        if let Some(bar) = &progress {
            bar.set_message(domain.as_str());
        }

        let mut timings = Vec::with_capacity(cmd.iterations);
        let mut succeeded = 0;
        for _ in 0..cmd.iterations {
            let start = Instant::now();
            let outcome = coordinator.run(question).await;
            timings.push(start.elapsed().as_secs_f64() * 1000.0);
            match outcome {
                Ok(_) => succeeded += 1,
                Err(e) if ctx.verbose => ctx.output.warn(&format!("{}: {}", domain, e)),
                Err(_) => {}
            }
            if let Some(bar) = &progress {
                bar.inc(1);
            }
        }

        let (mean_ms, std_ms) = mean_std(&timings);
        results.push(BenchResult {
            domain,
            question,
            runs: cmd.iterations,
            succeeded,
            mean_ms,
            std_ms,
        });
    }

    if let Some(bar) = progress {
        bar.finish_and_clear();
    }

    display_results(&results, ctx.output.format)
}

fn display_results(results: &[BenchResult], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => display_table(results),
        OutputFormat::Json => display_json(results),
        OutputFormat::Yaml => display_yaml(results),
    }
}

fn display_table(results: &[BenchResult]) -> Result<()> {
    println!("\n{}", "Benchmark Results".bold());

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Domain").fg(Color::Cyan),
        Cell::new("Runs").fg(Color::Cyan),
        Cell::new("Succeeded").fg(Color::Cyan),
        Cell::new("Mean (ms)").fg(Color::Cyan),
        Cell::new("Std (ms)").fg(Color::Cyan),
    ]);

    for result in results {
        let succeeded = if result.succeeded == result.runs {
            Cell::new(result.succeeded).fg(Color::Green)
        } else {
            Cell::new(result.succeeded).fg(Color::Red)
        };
        table.add_row(vec![
            Cell::new(result.domain.as_str()),
            Cell::new(result.runs),
            succeeded,
            Cell::new(format!("{:.2}", result.mean_ms)),
            Cell::new(format!("{:.2}", result.std_ms)),
        ]);
    }
    println!("{}", table);

    let total: usize = results.iter().map(|r| r.runs).sum();
    let passed: usize = results.iter().map(|r| r.succeeded).sum();
    println!("\n{}", "Summary".bold());
    println!("  Total: {}", total);
    println!("  {} {}", "Succeeded:".green(), passed);
    if passed < total {
        println!("  {} {}", "Failed:".red(), total - passed);
    }
    Ok(())
}

fn display_json(results: &[BenchResult]) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(results)?);
    Ok(())
}

fn display_yaml(results: &[BenchResult]) -> Result<()> {
    print!("{}", serde_yaml::to_string(results)?);
    Ok(())
}
