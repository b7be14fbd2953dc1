//! Investigate command
//!
//! ```bash
//! sci-lab investigate "How does temperature affect chemical reaction rate?"
//! sci-lab --offline investigate --samples 50 --seed 7 --save report.json
//! ```
//!
//! When the question is omitted it is read from an interactive prompt.

use anyhow::{Context as _, Result};
use clap::Args;
use colored::Colorize;
use comfy_table::{Cell, Color, Table};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use sci_lab_agents::{ExperimentOverrides, FailureReport, InvestigationReport, Verdict, WorkflowError};

use crate::context::Context;
use crate::output::{print_field, print_list, print_section};
use crate::plot::{self, PlotData};

/// Arguments for the investigate command
#[derive(Args, Debug)]
pub struct InvestigateCommand {
    /// Question to investigate; prompted for when omitted
    pub question: Option<String>,

    /// Override the domain's sample count
    #[arg(long)]
    pub samples: Option<usize>,

    /// Override the domain's noise level
    #[arg(long)]
    pub noise: Option<f64>,

    /// Seed for simulated noise
    #[arg(long)]
    pub seed: Option<u64>,

    /// Write the full report (or failure report) as JSON
    #[arg(long, value_name = "PATH")]
    pub save: Option<PathBuf>,

    /// Render observations, model curve and residuals (`.svg` or PNG)
    #[arg(long, value_name = "PATH")]
    pub plot: Option<PathBuf>,
}

impl InvestigateCommand {
    fn overrides(&self) -> ExperimentOverrides {
        ExperimentOverrides {
            sample_count: self.samples,
            noise_level: self.noise,
            seed: self.seed,
        }
    }
}

/// Execute the investigate command
pub async fn execute(ctx: &Context, cmd: InvestigateCommand) -> Result<()> {
    let question = match &cmd.question {
        Some(q) => q.clone(),
        None => prompt_question()?,
    };
    if question.trim().is_empty() {
        anyhow::bail!("A question is required");
    }

    let coordinator = ctx.coordinator()?.with_experiment_overrides(cmd.overrides());

    let spinner = ctx.output.spinner("Investigating...");
    let outcome = coordinator.run(&question).await;
    if let Some(s) = spinner {
        s.finish_and_clear();
    }

    match outcome {
        Ok(report) => {
            if let Some(path) = &cmd.save {
                save_json(path, &report)?;
                ctx.output.success(&format!("Report written to {}", path.display()));
            }
            if let Some(path) = &cmd.plot {
                let data = PlotData::new(
                    report.hypothesis.model.equation(),
                    &report.hypothesis.model,
                    &report.experiment.observations,
                );
                plot::render(path, &data)?;
                ctx.output.success(&format!("Plot written to {}", path.display()));
            }
            if ctx.output.is_table() {
                display_report(&report, ctx.verbose);
            } else {
                ctx.output.structured(&report)?;
            }
            Ok(())
        }
        Err(err) => {
            let failure = err.failure_report();
            if let Some(path) = &cmd.save {
                save_json(path, &failure)?;
                ctx.output.success(&format!("Failure report written to {}", path.display()));
            }
            if ctx.output.is_table() {
                display_failure(ctx, &err, &failure);
            } else {
                ctx.output.structured(&failure)?;
            }
            Err(err.into())
        }
    }
}

fn prompt_question() -> Result<String> {
    print!("{} ", "Research question:".bold());
    io::stdout().flush().context("Failed to flush stdout")?;

    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read question from stdin")?;
    Ok(line.trim().to_string())
}

fn save_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("Failed to serialize report")?;
    std::fs::write(path, json).with_context(|| format!("Failed to write report to {}", path.display()))
}

fn verdict_label(verdict: Verdict) -> String {
    let label = verdict.to_string().to_uppercase();
    match verdict {
        Verdict::Supported => label.green().bold().to_string(),
        Verdict::Inconclusive => label.yellow().bold().to_string(),
        Verdict::Refuted => label.red().bold().to_string(),
    }
}

fn display_report(report: &InvestigationReport, verbose: bool) {
    print_section("Investigation");
    print_field("Question", &report.question);
    print_field(
        "Domain",
        &format!("{} (confidence {:.2})", report.classification.domain, report.classification.confidence),
    );
    if let Some(ambiguity) = &report.classification.ambiguity {
        print_field("Note", &ambiguity.to_string());
    }

    print_section("Hypothesis");
    print_field("Statement", &report.hypothesis.statement);
    print_field("Model", &report.hypothesis.equation());
    print_field("Prior", &format!("{:.2}", report.hypothesis.confidence_prior));

    let design = &report.experiment.design;
    let analysis = &report.experiment.analysis;
    print_section("Experiment");
    print_field(
        "Sweep",
        &format!(
            "{} over [{}, {}], {} samples",
            design.independent_variable, design.value_range.min, design.value_range.max, design.sample_count
        ),
    );
    print_field("Noise", &format!("{:.3}", design.noise_level));
    if let Some(seed) = design.seed {
        print_field("Seed", &seed.to_string());
    }
    print_field("Correlation", &format!("{:.4}", analysis.correlation));
    print_field("MAE", &format!("{:.4}", analysis.mean_absolute_error));
    print_field("Fit", analysis.fit_quality.as_str());
    if let Some(p) = analysis.p_value {
        print_field("p-value", &format!("{:.3e}", p));
    }

    let conclusion = &report.conclusion;
    print_section("Conclusion");
    print_field("Verdict", &verdict_label(conclusion.verdict()));
    print_field("Confidence", &format!("{:.2}", conclusion.confidence()));
    println!("\n{}", conclusion.summary());
    if let Some(discussion) = conclusion.discussion() {
        println!("\n{}", discussion.dimmed());
    }

    if !conclusion.recommendations().is_empty() {
        print_section("Recommendations");
        print_list(conclusion.recommendations());
    }

    if verbose {
        print_section("Stage Records");
        let mut table = Table::new();
        table.set_header(vec![
            Cell::new("Stage").fg(Color::Cyan),
            Cell::new("Agent").fg(Color::Cyan),
            Cell::new("Duration (ms)").fg(Color::Cyan),
            Cell::new("Confidence").fg(Color::Cyan),
            Cell::new("Inputs Hash").fg(Color::Cyan),
        ]);
        for record in &report.records {
            table.add_row(vec![
                Cell::new(record.stage.to_string()),
                Cell::new(&record.agent_id),
                Cell::new(record.duration_ms),
                Cell::new(format!("{:.3}", record.confidence)),
                Cell::new(&record.inputs_hash[..12.min(record.inputs_hash.len())]),
            ]);
        }
        println!("{}", table);
        print_field("Run ID", &report.run_id.to_string());
        print_field("Total", &format!("{} ms", report.duration_ms));
    }
}

fn display_failure(ctx: &Context, err: &WorkflowError, failure: &FailureReport) {
    ctx.output.error(&err.to_string());

    print_section("Investigation Failed");
    print_field("Question", &failure.question);
    print_field("Failed Stage", &failure.failed_stage.to_string());
    print_field("Last Completed", &failure.last_completed.to_string());
    print_field("Cause", &failure.cause);

    if !failure.recommendations.is_empty() {
        print_section("Recommendations");
        print_list(&failure.recommendations);
    }
}
