//! Convergence plot
//!
//! Gantree: L4_Integration → Plot
//!
//! Log-log SVG of both mean infidelity curves and their power-law fits.
//! Plotting is diagnostic: callers log a failure and carry on.

use crate::aggregate::AggregateResult;
use crate::fit::TrackFits;
use emqst_core::error::{EmqstError, EmqstResult};
use plotters::prelude::*;
use std::path::Path;

/// Plot file name inside the run directory
pub const PLOT_FILE: &str = "Averaged_infidelities.svg";

const SIZE: (u32, u32) = (900, 600);
const CORRECTED: RGBColor = RGBColor(31, 119, 180);
const UNCORRECTED: RGBColor = RGBColor(214, 39, 40);

fn plot_err<E: std::fmt::Display>(err: E) -> EmqstError {
    EmqstError::Plot(err.to_string())
}

/// (n, y) points with n from 1, skipping `cutoff` points and non-positive values
fn points(curve: &[f64], cutoff: usize) -> Vec<(f64, f64)> {
    curve
        .iter()
        .enumerate()
        .skip(cutoff)
        .map(|(i, &y)| ((i + 1) as f64, y))
        .filter(|&(_, y)| y > 0.0 && y.is_finite())
        .collect()
}

/// Render the averaged infidelities
/// Gantree: plot_infidelities(agg,fits,cutoff,path) -> Result<()> // 수렴 그래프
pub fn plot_infidelities(
    aggregate: &AggregateResult,
    fits: &TrackFits,
    cutoff: usize,
    path: &Path,
) -> EmqstResult<()> {
    let corrected = points(&aggregate.corrected_mean, cutoff);
    let uncorrected = points(&aggregate.uncorrected_mean, cutoff);
    if corrected.is_empty() && uncorrected.is_empty() {
        return Err(EmqstError::Plot(format!(
            "nothing to plot after skipping {} points",
            cutoff
        )));
    }

    let all = corrected.iter().chain(&uncorrected);
    let x_max = all.clone().map(|p| p.0).fold(1.0, f64::max) * 1.1;
    let x_min = all.clone().map(|p| p.0).fold(f64::INFINITY, f64::min);
    let y_max = all.clone().map(|p| p.1).fold(f64::MIN_POSITIVE, f64::max) * 2.0;
    let y_min = all.map(|p| p.1).fold(f64::INFINITY, f64::min) / 2.0;

    let root = SVGBackend::new(path, SIZE).into_drawing_area();
    root.fill(&WHITE).map_err(plot_err)?;

    let mut chart = ChartBuilder::on(&root)
        .caption("Averaged infidelities", ("sans-serif", 22))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(70)
        .build_cartesian_2d((x_min..x_max).log_scale(), (y_min..y_max).log_scale())
        .map_err(plot_err)?;

    chart
        .configure_mesh()
        .x_desc("shots")
        .y_desc("mean infidelity")
        .y_label_formatter(&|y| format!("{:.0e}", y))
        .draw()
        .map_err(plot_err)?;

    for (curve, color, label, fit) in [
        (&corrected, CORRECTED, "corrected", fits.corrected),
        (&uncorrected, UNCORRECTED, "uncorrected", fits.uncorrected),
    ] {
        chart
            .draw_series(LineSeries::new(curve.iter().copied(), &color))
            .map_err(plot_err)?
            .label(label)
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color));

        if let Some(fit) = fit {
            let fitted: Vec<(f64, f64)> = curve.iter().map(|&(n, _)| (n, fit.evaluate(n))).collect();
            chart
                .draw_series(LineSeries::new(fitted, color.stroke_width(2)))
                .map_err(plot_err)?
                .label(format!("{} fit {}", label, fit))
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2))
                });
        }
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()
        .map_err(plot_err)?;
    root.present().map_err(plot_err)?;
    Ok(())
}
