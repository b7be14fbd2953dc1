//! Classify command

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, Table};

use sci_lab_agents::{Domain, DomainClassifier};

use crate::context::Context;
use crate::output::{print_field, print_section};

/// Arguments for the classify command
#[derive(Args, Debug)]
pub struct ClassifyCommand {
    /// Question to classify
    pub question: String,
}

/// Execute the classify command
pub async fn execute(ctx: &Context, cmd: ClassifyCommand) -> Result<()> {
    let classifier = DomainClassifier::new(ctx.config.fallback_domain);
    let classification = classifier.classify(&cmd.question);

    if !ctx.output.is_table() {
        return ctx.output.structured(&classification);
    }

    print_section("Classification");
    print_field("Domain", classification.domain.as_str());
    print_field("Confidence", &format!("{:.2}", classification.confidence));
    if let Some(ambiguity) = &classification.ambiguity {
        print_field("Note", &ambiguity.to_string());
    }

    let mut table = Table::new();
    table.set_header(vec![Cell::new("Domain").fg(Color::Cyan), Cell::new("Score").fg(Color::Cyan)]);
    for domain in Domain::ALL {
        let score = classification.scores.get(&domain).copied().unwrap_or(0.0);
        let name = if domain == classification.domain {
            Cell::new(domain.as_str()).fg(Color::Green)
        } else {
            Cell::new(domain.as_str())
        };
        table.add_row(vec![name, Cell::new(format!("{:.1}", score))]);
    }
    println!("\n{}", table);

    Ok(())
}
