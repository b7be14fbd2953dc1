//! Simulate command
//!
//! Runs the simulation engine and analyzer directly, without the theory
//! and collection stages.

use anyhow::{Context as _, Result};
use clap::Args;
use comfy_table::{Cell, Color, Table};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use sci_lab_agents::agents::ModelCatalog;
use sci_lab_agents::contracts::{AnalysisResult, ExperimentDesign};
use sci_lab_agents::{Domain, SimulationEngine, StatisticalAnalyzer};

use crate::context::Context;
use crate::output::{print_field, print_section};
use crate::plot::{self, PlotData};

/// Arguments for the simulate command
#[derive(Args, Debug)]
pub struct SimulateCommand {
    /// Domain whose generator and model are used
    #[arg(short, long)]
    pub domain: Domain,

    /// Topic words used to pick the model (e.g. "temperature")
    #[arg(long, default_value = "")]
    pub topic: String,

    /// Number of samples (domain default when omitted)
    #[arg(long)]
    pub samples: Option<usize>,

    /// Relative noise level (domain default when omitted)
    #[arg(long)]
    pub noise: Option<f64>,

    /// Seed for the noise generator
    #[arg(long)]
    pub seed: Option<u64>,

    /// Render observations, model curve and residuals (`.svg` or PNG)
    #[arg(long, value_name = "PATH")]
    pub plot: Option<PathBuf>,
}

#[derive(Debug, Serialize)]
struct SimulatedPoint {
    x: f64,
    measured: f64,
    predicted: f64,
}

#[derive(Debug, Serialize)]
struct SimulationOutput {
    equation: String,
    design: ExperimentDesign,
    observations: Vec<SimulatedPoint>,
    analysis: AnalysisResult,
}

/// Execute the simulate command
pub async fn execute(ctx: &Context, cmd: SimulateCommand) -> Result<()> {
    let model = ModelCatalog::new()
        .select(cmd.domain, &cmd.topic)
        .context("Failed to build model")?;
    let defaults = ctx.config.domain_defaults(cmd.domain);

    let design = ExperimentDesign {
        id: Uuid::new_v4(),
        domain: cmd.domain,
        independent_variable: model.independent_variable().name.clone(),
        value_range: model.valid_range(),
        sample_count: cmd.samples.unwrap_or(defaults.sample_count),
        fixed_parameters: model.parameters().clone(),
        noise_level: cmd.noise.unwrap_or(defaults.noise_level),
        seed: Some(cmd.seed.unwrap_or(ctx.config.seed)),
    };

    let engine = SimulationEngine::new().with_default_seed(ctx.config.seed);
    let observations = engine.simulate(&design, &model, None).context("Simulation failed")?;
    let analysis = StatisticalAnalyzer::with_config(&ctx.config)
        .analyze(&observations, &model)
        .context("Analysis failed")?;

    if let Some(path) = &cmd.plot {
        let title = format!("{}: {}", cmd.domain, model.equation());
        plot::render(path, &PlotData::new(title, &model, &observations))?;
        ctx.output.success(&format!("Plot written to {}", path.display()));
    }

    let output = SimulationOutput {
        equation: model.equation(),
        observations: observations
            .iter()
            .map(|o| SimulatedPoint {
                x: o.independent_value,
                measured: o.measured_value,
                predicted: model.evaluate(o.independent_value),
            })
            .collect(),
        design,
        analysis,
    };

    if !ctx.output.is_table() {
        return ctx.output.structured(&output);
    }

    print_section(&format!("Simulation: {}", cmd.domain));
    print_field("Model", &output.equation);
    print_field("Samples", &output.design.sample_count.to_string());
    print_field("Noise", &format!("{:.3}", output.design.noise_level));
    if let Some(seed) = output.design.seed {
        print_field("Seed", &seed.to_string());
    }

    let x_name = &output.design.independent_variable;
    let mut table = Table::new();
    table.set_header(vec![
        Cell::new(x_name).fg(Color::Cyan),
        Cell::new("Measured").fg(Color::Cyan),
        Cell::new("Predicted").fg(Color::Cyan),
    ]);
    for point in &output.observations {
        table.add_row(vec![
            Cell::new(format!("{:.3}", point.x)),
            Cell::new(format!("{:.4}", point.measured)),
            Cell::new(format!("{:.4}", point.predicted)),
        ]);
    }
    println!("\n{}", table);

    print_section("Analysis");
    print_field("Correlation", &format!("{:.4}", output.analysis.correlation));
    print_field("MAE", &format!("{:.4}", output.analysis.mean_absolute_error));
    print_field("RMSE", &format!("{:.4}", output.analysis.root_mean_squared_error));
    print_field("Fit", output.analysis.fit_quality.as_str());
    print_field("Confidence", &format!("{:.3}", output.analysis.confidence_score));

    Ok(())
}
