//! Domains command

use anyhow::Result;
use comfy_table::{Cell, Color, Table};
use serde::Serialize;

use sci_lab_agents::agents::default_template;
use sci_lab_agents::Domain;

use crate::context::Context;

#[derive(Debug, Serialize)]
struct DomainInfo {
    domain: Domain,
    sample_count: usize,
    noise_level: f64,
    default_model: String,
    context: &'static str,
}

/// Execute the domains command
pub async fn execute(ctx: &Context) -> Result<()> {
    let domains: Vec<DomainInfo> = Domain::ALL
        .iter()
        .map(|&domain| {
            let defaults = ctx.config.domain_defaults(domain);
            DomainInfo {
                domain,
                sample_count: defaults.sample_count,
                noise_level: defaults.noise_level,
                default_model: default_template(domain).form.to_string(),
                context: domain.theoretical_context(),
            }
        })
        .collect();

    if !ctx.output.is_table() {
        return ctx.output.structured(&domains);
    }

    let mut table = Table::new();
    table.set_header(vec![
        Cell::new("Domain").fg(Color::Cyan),
        Cell::new("Samples").fg(Color::Cyan),
        Cell::new("Noise").fg(Color::Cyan),
        Cell::new("Default Model").fg(Color::Cyan),
        Cell::new("Theory").fg(Color::Cyan),
    ]);
    for info in &domains {
        table.add_row(vec![
            Cell::new(info.domain.as_str()),
            Cell::new(info.sample_count),
            Cell::new(format!("{:.2}", info.noise_level)),
            Cell::new(&info.default_model),
            Cell::new(info.context),
        ]);
    }
    println!("{}", table);

    Ok(())
}
