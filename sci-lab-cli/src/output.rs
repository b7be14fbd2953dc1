//! Output formatting

use anyhow::Result;
use clap::ValueEnum;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;
use std::time::Duration;

/// Rendering of command results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Table,
    Json,
    Yaml,
}

/// Writes results and status lines in the selected format.
#[derive(Debug, Clone)]
pub struct Output {
    pub format: OutputFormat,
}

impl Output {
    pub fn new(format: OutputFormat, no_color: bool) -> Self {
        if no_color {
            colored::control::set_override(false);
        }
        Self { format }
    }

    pub fn is_table(&self) -> bool {
        self.format == OutputFormat::Table
    }

    /// Spinner shown only for table output, so machine-readable output stays clean.
    pub fn spinner(&self, message: &str) -> Option<ProgressBar> {
        if !self.is_table() {
            return None;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(100));
        Some(spinner)
    }

    /// Progress bar over `len` steps, table output only.
    pub fn progress(&self, len: u64) -> Option<ProgressBar> {
        if !self.is_table() {
            return None;
        }
        let bar = ProgressBar::new(len);
        if let Ok(style) = ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        Some(bar)
    }

    pub fn success(&self, message: &str) {
        eprintln!("{} {}", "✓".green(), message);
    }

    pub fn warn(&self, message: &str) {
        eprintln!("{} {}", "!".yellow(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red(), message);
    }

    /// Print `value` as JSON or YAML. Table output is left to the caller.
    pub fn structured<T: Serialize>(&self, value: &T) -> Result<()> {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
            OutputFormat::Yaml => print!("{}", serde_yaml::to_string(value)?),
            OutputFormat::Table => {}
        }
        Ok(())
    }
}

pub fn print_section(title: &str) {
    println!("\n{}", title.bold().cyan());
    println!("{}", "=".repeat(title.len().max(40)));
}

pub fn print_field(name: &str, value: &str) {
    println!("  {:<16} {}", format!("{}:", name).bold(), value);
}

pub fn print_list(items: &[String]) {
    for (i, item) in items.iter().enumerate() {
        println!("  {}. {}", i + 1, item);
    }
}
