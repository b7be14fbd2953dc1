//! Result plots
//!
//! Two panels side by side: observations with the model curve, and the
//! residuals (measured minus predicted) against the swept variable. The
//! file extension picks the backend: `.svg` writes SVG, anything else PNG.

use anyhow::{Context as _, Result};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ops::Range;
use std::path::Path;

use sci_lab_agents::contracts::Observation;
use sci_lab_agents::MathModel;

const CURVE_POINTS: usize = 200;
const SIZE: (u32, u32) = (1200, 500);

/// Everything drawn on a results plot.
#[derive(Debug, Clone)]
pub struct PlotData {
    pub title: String,
    pub x_label: String,
    pub y_label: String,
    pub observations: Vec<(f64, f64)>,
    pub curve: Vec<(f64, f64)>,
    pub residuals: Vec<(f64, f64)>,
}

impl PlotData {
    pub fn new(title: impl Into<String>, model: &MathModel, observations: &[Observation]) -> Self {
        let range = model.valid_range();
        let step = range.span() / (CURVE_POINTS - 1) as f64;
        let curve = (0..CURVE_POINTS)
            .map(|i| range.min + step * i as f64)
            .map(|x| (x, model.evaluate(x)))
            .filter(|(_, y)| y.is_finite())
            .collect();

        let x = model.independent_variable();
        let y = model.dependent_variable();
        Self {
            title: title.into(),
            x_label: axis_label(&x.name, &x.unit),
            y_label: axis_label(&y.name, &y.unit),
            observations: observations.iter().map(|o| (o.independent_value, o.measured_value)).collect(),
            curve,
            residuals: observations
                .iter()
                .map(|o| (o.independent_value, o.measured_value - model.evaluate(o.independent_value)))
                .collect(),
        }
    }

    fn x_bounds(&self) -> Range<f64> {
        padded_bounds(self.observations.iter().chain(&self.curve).map(|p| p.0))
    }

    fn y_bounds(&self) -> Range<f64> {
        padded_bounds(self.observations.iter().chain(&self.curve).map(|p| p.1))
    }

    fn residual_bounds(&self) -> Range<f64> {
        // Keep zero on the axis so the reference line is visible.
        padded_bounds(self.residuals.iter().map(|p| p.1).chain(std::iter::once(0.0)))
    }
}

fn axis_label(name: &str, unit: &str) -> String {
    if unit.is_empty() {
        name.to_string()
    } else {
        format!("{} ({})", name, unit)
    }
}

/// Min..max of `values` widened by 5%, or by one when flat or empty.
fn padded_bounds(values: impl Iterator<Item = f64>) -> Range<f64> {
    let (min, max) = values
        .filter(|v| v.is_finite())
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if !min.is_finite() {
        return -1.0..1.0;
    }
    let pad = if max > min { (max - min) * 0.05 } else { 1.0 };
    (min - pad)..(max + pad)
}

/// Render `data` to `path`.
pub fn render(path: &Path, data: &PlotData) -> Result<()> {
    let is_svg = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("svg"));

    let rendered = if is_svg {
        draw(SVGBackend::new(path, SIZE).into_drawing_area(), data)
    } else {
        draw(BitMapBackend::new(path, SIZE).into_drawing_area(), data)
    };
    rendered.with_context(|| format!("Failed to render plot to {}", path.display()))
}

fn draw<DB>(root: DrawingArea<DB, Shift>, data: &PlotData) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let (left, right) = root.split_horizontally((SIZE.0 / 2) as i32);

    let mut chart = ChartBuilder::on(&left)
        .caption(&data.title, ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(data.x_bounds(), data.y_bounds())?;

    chart
        .configure_mesh()
        .x_desc(data.x_label.as_str())
        .y_desc(data.y_label.as_str())
        .draw()?;

    chart
        .draw_series(LineSeries::new(data.curve.clone(), &RED))?
        .label("model")
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], RED));

    chart
        .draw_series(data.observations.iter().map(|&(x, y)| Circle::new((x, y), 4, BLUE.filled())))?
        .label("observed")
        .legend(|(x, y)| Circle::new((x + 10, y), 4, BLUE.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .position(SeriesLabelPosition::UpperLeft)
        .draw()?;

    let x_range = data.x_bounds();
    let mut residuals = ChartBuilder::on(&right)
        .caption("Residuals", ("sans-serif", 20))
        .margin(20)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range.clone(), data.residual_bounds())?;

    residuals
        .configure_mesh()
        .x_desc(data.x_label.as_str())
        .y_desc("measured - predicted")
        .draw()?;

    residuals.draw_series(LineSeries::new(vec![(x_range.start, 0.0), (x_range.end, 0.0)], BLACK.mix(0.5)))?;
    residuals.draw_series(data.residuals.iter().map(|&(x, r)| Circle::new((x, r), 4, MAGENTA.filled())))?;

    root.present()?;
    Ok(())
}
