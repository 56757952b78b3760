//! Posterior corner plots.
//!
//! One panel per parameter pair: marginal histograms on the diagonal
//! (captioned with the 16/50/84 quantiles), pairwise scatter below it,
//! blank above. Rendered to SVG via Plotters; the layout mirrors the
//! classic corner-plot figures used to eyeball chain health.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use plotters::prelude::*;

use crate::domain::{Chain, CHAIN_COLUMNS, N_PARAMS};
use crate::error::AppError;

/// Histogram bins per marginal panel.
const N_BINS: usize = 30;

/// Cap on scatter points per panel; chains are thinned above this.
const MAX_SCATTER: usize = 2000;

/// Rendered figure edge (pixels).
const FIGURE_SIZE: u32 = 1400;

/// Path of the corner plot for one object.
pub fn figure_path(figures_dir: &Path, snid: u64) -> PathBuf {
    figures_dir.join(format!("SN{snid}_corner.svg"))
}

/// Render the corner plot for a chain (parameters + age column).
pub fn render_corner(path: &Path, chain: &Chain) -> Result<(), AppError> {
    if chain.is_empty() {
        return Err(AppError::data("Cannot plot an empty chain."));
    }
    if let Some(parent) = path.parent() {
        create_dir_all(parent)
            .map_err(|e| AppError::runtime(format!("Failed to create figures dir: {e}")))?;
    }

    let columns = collect_columns(chain);
    let n = columns.len();

    let root = SVGBackend::new(path, (FIGURE_SIZE, FIGURE_SIZE)).into_drawing_area();
    root.fill(&WHITE)
        .map_err(|e| AppError::runtime(format!("Corner plot fill failed: {e}")))?;
    let panels = root.split_evenly((n, n));

    for row in 0..n {
        for col in 0..=row {
            let panel = &panels[row * n + col];
            if row == col {
                draw_marginal(panel, &columns[col], CHAIN_COLUMNS[col])
                    .map_err(|e| AppError::runtime(format!("Corner plot panel failed: {e}")))?;
            } else {
                draw_pair(panel, &columns[col], &columns[row], CHAIN_COLUMNS[col], CHAIN_COLUMNS[row])
                    .map_err(|e| AppError::runtime(format!("Corner plot panel failed: {e}")))?;
            }
        }
    }

    root.present()
        .map_err(|e| AppError::runtime(format!("Failed to write corner plot '{}': {e}", path.display())))?;
    Ok(())
}

fn collect_columns(chain: &Chain) -> Vec<Vec<f64>> {
    let mut columns: Vec<Vec<f64>> = (0..N_PARAMS)
        .map(|i| chain.params.iter().map(|row| row[i]).collect())
        .collect();
    columns.push(chain.ages.clone());
    columns
}

fn padded_range(values: &[f64]) -> (f64, f64) {
    let mut lo = f64::INFINITY;
    let mut hi = f64::NEG_INFINITY;
    for &v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if !(lo.is_finite() && hi.is_finite()) {
        return (0.0, 1.0);
    }
    if hi - lo < 1e-12 {
        // Collapsed marginal (e.g. a pegged parameter); give it visible width.
        return (lo - 0.5, hi + 0.5);
    }
    let pad = 0.05 * (hi - lo);
    (lo - pad, hi + pad)
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() as f64 - 1.0);
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

type DrawResult = Result<(), Box<dyn std::error::Error>>;

fn draw_marginal(
    area: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
    values: &[f64],
    label: &str,
) -> DrawResult {
    let (lo, hi) = padded_range(values);
    let width = (hi - lo) / N_BINS as f64;
    let mut counts = [0usize; N_BINS];
    for &v in values {
        let bin = (((v - lo) / width) as usize).min(N_BINS - 1);
        counts[bin] += 1;
    }
    let peak = counts.iter().copied().max().unwrap_or(1).max(1) as f64;

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let (q16, q50, q84) = (
        quantile(&sorted, 0.16),
        quantile(&sorted, 0.50),
        quantile(&sorted, 0.84),
    );
    let caption = format!(
        "{label} = {:.2} (+{:.2}/-{:.2})",
        q50,
        q84 - q50,
        q50 - q16
    );

    let mut chart = ChartBuilder::on(area)
        .margin(4)
        .caption(caption, ("sans-serif", 11))
        .x_label_area_size(16)
        .build_cartesian_2d(lo..hi, 0.0..1.05)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(3)
        .y_labels(0)
        .label_style(("sans-serif", 9))
        .draw()?;

    // Histogram as a step outline; bin heights normalized to the peak.
    let mut outline: Vec<(f64, f64)> = Vec::with_capacity(2 * N_BINS + 2);
    outline.push((lo, 0.0));
    for (i, &count) in counts.iter().enumerate() {
        let x0 = lo + width * i as f64;
        let x1 = x0 + width;
        let h = count as f64 / peak;
        outline.push((x0, h));
        outline.push((x1, h));
    }
    outline.push((hi, 0.0));
    chart.draw_series(LineSeries::new(outline, &BLACK))?;

    // Quantile markers.
    for q in [q16, q50, q84] {
        chart.draw_series(LineSeries::new(
            [(q, 0.0), (q, 1.0)],
            BLACK.mix(0.4).stroke_width(1),
        ))?;
    }
    Ok(())
}

fn draw_pair(
    area: &DrawingArea<SVGBackend<'_>, plotters::coord::Shift>,
    xs: &[f64],
    ys: &[f64],
    x_label: &str,
    y_label: &str,
) -> DrawResult {
    let (x_lo, x_hi) = padded_range(xs);
    let (y_lo, y_hi) = padded_range(ys);

    let mut chart = ChartBuilder::on(area)
        .margin(4)
        .x_label_area_size(16)
        .y_label_area_size(24)
        .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc(x_label)
        .y_desc(y_label)
        .x_labels(3)
        .y_labels(3)
        .label_style(("sans-serif", 9))
        .axis_desc_style(("sans-serif", 10))
        .draw()?;

    let stride = (xs.len() / MAX_SCATTER).max(1);
    chart.draw_series(
        xs.iter()
            .zip(ys.iter())
            .step_by(stride)
            .map(|(&x, &y)| Circle::new((x, y), 1, BLACK.mix(0.25).filled())),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::N_PARAMS;

    fn synthetic_chain(n: usize) -> Chain {
        // Deterministic pseudo-spread without an RNG.
        let params = (0..n)
            .map(|k| {
                let f = k as f64 / n as f64;
                let mut row = [0.0; N_PARAMS];
                row[0] = -0.5 + 0.4 * (f * 12.0).sin();
                row[1] = 0.2 + 0.1 * (f * 7.0).cos();
                row[2] = 1.0 + f;
                row[3] = 1.0 + 0.5 * f;
                row[4] = 9.0 + f;
                row[5] = 0.5 + 0.2 * (f * 3.0).sin();
                row[6] = -20.0 - f;
                row
            })
            .collect::<Vec<_>>();
        let ages = (0..n).map(|k| 6.0 + (k as f64 / n as f64) * 3.0).collect();
        Chain { params, ages }
    }

    #[test]
    fn corner_plot_writes_an_svg() {
        let dir = std::env::temp_dir().join("snage-corner-test");
        let path = figure_path(&dir, 10028);
        render_corner(&path, &synthetic_chain(400)).unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("<svg"));
        assert!(contents.len() > 1000);
    }

    #[test]
    fn empty_chain_is_rejected() {
        let dir = std::env::temp_dir().join("snage-corner-test");
        let chain = Chain {
            params: Vec::new(),
            ages: Vec::new(),
        };
        assert!(render_corner(&figure_path(&dir, 1), &chain).is_err());
    }

    #[test]
    fn figure_paths_carry_the_snid() {
        assert_eq!(
            figure_path(Path::new("figures"), 18749),
            PathBuf::from("figures/SN18749_corner.svg")
        );
    }
}
