//! SVG charts of feature distributions and outcome relationships

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};
use plotters::prelude::*;
use polars::prelude::{DataFrame, DataType};
use tracing::debug;

/// Facet panels drawn at most, most frequent values first.
pub const MAX_FACETS: usize = 12;

const CHART_SIZE: (u32, u32) = (900, 560);
const DENSITY_POINTS: usize = 200;
const FONT: &str = "sans-serif";

/// Non-null values of a numeric column as f64.
pub fn numeric_values(df: &DataFrame, column: &str) -> Result<Vec<Option<f64>>> {
    let series = df
        .column(column)
        .with_context(|| format!("Column '{}' not found", column))?;
    if !series.dtype().is_primitive_numeric() {
        anyhow::bail!("Column '{}' is not numeric ({})", column, series.dtype());
    }
    let cast = series.cast(&DataType::Float64)?;
    Ok(cast.f64()?.into_iter().collect())
}

/// Category labels of a column rendered as strings.
pub fn group_labels(df: &DataFrame, column: &str) -> Result<Vec<Option<String>>> {
    let series = df
        .column(column)
        .with_context(|| format!("Column '{}' not found", column))?;
    let cast = series.cast(&DataType::String)?;
    Ok(cast
        .str()?
        .into_iter()
        .map(|v| v.map(|s| s.to_string()))
        .collect())
}

fn non_null(column: &str, values: &[Option<f64>]) -> Result<Vec<f64>> {
    let kept: Vec<f64> = values.iter().flatten().copied().filter(|v| v.is_finite()).collect();
    if kept.is_empty() {
        anyhow::bail!("Column '{}' has no non-null values to plot", column);
    }
    Ok(kept)
}

fn bounds(values: &[f64]) -> (f64, f64) {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    }
}

/// Equal-width bin counts over `[min, max]`; the last bin is closed.
pub fn histogram_counts(values: &[f64], bins: usize) -> Vec<(f64, f64, usize)> {
    let bins = bins.max(1);
    let (min, max) = bounds(values);
    let width = (max - min) / bins as f64;
    let mut counts = vec![0usize; bins];
    for &v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }
    counts
        .into_iter()
        .enumerate()
        .map(|(i, c)| (min + i as f64 * width, min + (i + 1) as f64 * width, c))
        .collect()
}

/// Silverman's rule-of-thumb bandwidth, `0.9 * min(sd, IQR / 1.34) * n^(-1/5)`.
pub fn silverman_bandwidth(values: &[f64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 1.0;
    }
    let mean = values.iter().sum::<f64>() / n as f64;
    let sd = (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt();

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let iqr = quantile(&sorted, 0.75) - quantile(&sorted, 0.25);

    let spread = match (sd > 0.0, iqr > 0.0) {
        (true, true) => sd.min(iqr / 1.34),
        (true, false) => sd,
        (false, true) => iqr / 1.34,
        (false, false) => return 1.0,
    };
    0.9 * spread * (n as f64).powf(-0.2)
}

/// Linear-interpolated quantile of sorted data.
fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

/// Gaussian kernel density of `values` evaluated at each point of `grid`.
pub fn gaussian_kde(values: &[f64], bandwidth: f64, grid: &[f64]) -> Vec<f64> {
    let n = values.len() as f64;
    let norm = 1.0 / (n * bandwidth * (2.0 * std::f64::consts::PI).sqrt());
    grid.iter()
        .map(|&x| {
            values
                .iter()
                .map(|&v| {
                    let z = (x - v) / bandwidth;
                    (-0.5 * z * z).exp()
                })
                .sum::<f64>()
                * norm
        })
        .collect()
}

/// Group `values` by `labels`, skipping rows where either is null.
/// Groups are returned most frequent first, ties by label.
fn grouped(values: &[Option<f64>], labels: &[Option<String>]) -> Vec<(String, Vec<f64>)> {
    let mut map: HashMap<&str, Vec<f64>> = HashMap::new();
    for (v, l) in values.iter().zip(labels) {
        if let (Some(v), Some(l)) = (v, l) {
            if v.is_finite() {
                map.entry(l.as_str()).or_default().push(*v);
            }
        }
    }
    let mut groups: Vec<(String, Vec<f64>)> =
        map.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
    groups.sort_by(|a, b| b.1.len().cmp(&a.1.len()).then_with(|| a.0.cmp(&b.0)));
    groups
}

/// Histogram of a numeric column.
pub fn histogram(df: &DataFrame, column: &str, bins: usize, path: &Path) -> Result<()> {
    let values = non_null(column, &numeric_values(df, column)?)?;
    let counts = histogram_counts(&values, bins);
    let (min, max) = bounds(&values);
    let y_max = counts.iter().map(|c| c.2).max().unwrap_or(1) as f64 * 1.1;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Distribution of {}", column), (FONT, 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(min..max, 0f64..y_max.max(1.0))?;

    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("count")
        .draw()?;

    chart.draw_series(counts.iter().map(|&(lo, hi, c)| {
        Rectangle::new([(lo, 0.0), (hi, c as f64)], BLUE.mix(0.6).filled())
    }))?;

    root.present()
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    debug!(column, bins, path = %path.display(), "histogram written");
    Ok(())
}

/// Kernel density of `column` for each value of `group_by`, overlaid.
pub fn density_by_group(df: &DataFrame, column: &str, group_by: &str, path: &Path) -> Result<()> {
    let values = numeric_values(df, column)?;
    let labels = group_labels(df, group_by)?;
    let groups = grouped(&values, &labels);
    if groups.is_empty() {
        anyhow::bail!("Column '{}' has no non-null values to plot", column);
    }

    let all: Vec<f64> = groups.iter().flat_map(|(_, v)| v.iter().copied()).collect();
    let (min, max) = bounds(&all);
    let pad = silverman_bandwidth(&all) * 2.0;
    let (lo, hi) = (min - pad, max + pad);
    let grid: Vec<f64> = (0..DENSITY_POINTS)
        .map(|i| lo + (hi - lo) * i as f64 / (DENSITY_POINTS - 1) as f64)
        .collect();

    let curves: Vec<(String, Vec<f64>)> = groups
        .iter()
        .map(|(label, v)| (label.clone(), gaussian_kde(v, silverman_bandwidth(v), &grid)))
        .collect();
    let y_max = curves
        .iter()
        .flat_map(|(_, d)| d.iter().copied())
        .fold(0.0f64, f64::max)
        * 1.1;

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("Density of {} by {}", column, group_by), (FONT, 24))
        .margin(15)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(lo..hi, 0f64..y_max.max(f64::EPSILON))?;

    chart
        .configure_mesh()
        .x_desc(column)
        .y_desc("density")
        .draw()?;

    for (i, (label, density)) in curves.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        chart
            .draw_series(LineSeries::new(
                grid.iter().copied().zip(density.iter().copied()),
                color.stroke_width(2),
            ))?
            .label(label.as_str())
            .legend(move |(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(2)));
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.85))
        .border_style(BLACK)
        .draw()?;

    root.present()
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    debug!(column, group_by, groups = curves.len(), "density chart written");
    Ok(())
}

struct ScatterPoints {
    x: Vec<Option<f64>>,
    y: Vec<Option<f64>>,
    color: Vec<Option<String>>,
}

impl ScatterPoints {
    fn load(df: &DataFrame, x: &str, y: &str, color_by: &str) -> Result<Self> {
        let points = Self {
            x: numeric_values(df, x)?,
            y: numeric_values(df, y)?,
            color: group_labels(df, color_by)?,
        };
        non_null(x, &points.x)?;
        non_null(y, &points.y)?;
        Ok(points)
    }

    /// Complete (x, y, colour) triples in row order.
    fn complete(&self, keep: impl Fn(usize) -> bool) -> Vec<(f64, f64, &str)> {
        (0..self.x.len())
            .filter(|&i| keep(i))
            .filter_map(|i| match (self.x[i], self.y[i], self.color[i].as_deref()) {
                (Some(x), Some(y), Some(c)) if x.is_finite() && y.is_finite() => Some((x, y, c)),
                _ => None,
            })
            .collect()
    }

    /// Sorted distinct colour labels.
    fn levels(&self) -> Vec<String> {
        let mut levels: Vec<String> = self.color.iter().flatten().cloned().collect();
        levels.sort();
        levels.dedup();
        levels
    }
}

fn draw_points<DB: DrawingBackend>(
    area: &DrawingArea<DB, plotters::coord::Shift>,
    caption: &str,
    x_desc: &str,
    y_desc: &str,
    points: &[(f64, f64, &str)],
    levels: &[String],
    ranges: ((f64, f64), (f64, f64)),
    legend: bool,
) -> Result<()>
where
    DB::ErrorType: 'static,
{
    let ((x0, x1), (y0, y1)) = ranges;
    let mut chart = ChartBuilder::on(area)
        .caption(caption, (FONT, if legend { 24 } else { 16 }))
        .margin(10)
        .x_label_area_size(35)
        .y_label_area_size(45)
        .build_cartesian_2d(x0..x1, y0..y1)
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    chart
        .configure_mesh()
        .x_desc(x_desc)
        .y_desc(y_desc)
        .draw()
        .map_err(|e| anyhow::anyhow!("{}", e))?;

    for (i, level) in levels.iter().enumerate() {
        let color = Palette99::pick(i).to_rgba();
        let series = points
            .iter()
            .filter(|p| p.2 == level.as_str())
            .map(|&(x, y, _)| Circle::new((x, y), 3, color.mix(0.6).filled()));
        let drawn = chart
            .draw_series(series)
            .map_err(|e| anyhow::anyhow!("{}", e))?;
        if legend {
            drawn
                .label(level.as_str())
                .legend(move |(x, y)| Circle::new((x, y), 4, color.filled()));
        }
    }

    if legend && !levels.is_empty() {
        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.85))
            .border_style(BLACK)
            .draw()
            .map_err(|e| anyhow::anyhow!("{}", e))?;
    }
    Ok(())
}

fn padded_bounds(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let all: Vec<f64> = values.collect();
    let (min, max) = bounds(&all);
    let pad = (max - min) * 0.03;
    (min - pad, max + pad)
}

/// Scatter of `y` against `x` with points coloured by `color_by`.
pub fn scatter(df: &DataFrame, x: &str, y: &str, color_by: &str, path: &Path) -> Result<()> {
    let data = ScatterPoints::load(df, x, y, color_by)?;
    let points = data.complete(|_| true);
    if points.is_empty() {
        anyhow::bail!("No complete rows to plot for {} vs {}", y, x);
    }
    let ranges = (
        padded_bounds(points.iter().map(|p| p.0)),
        padded_bounds(points.iter().map(|p| p.1)),
    );

    let root = SVGBackend::new(path, CHART_SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    draw_points(
        &root,
        &format!("{} vs {} by {}", y, x, color_by),
        x,
        y,
        &points,
        &data.levels(),
        ranges,
        true,
    )?;
    root.present()
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    debug!(x, y, color_by, points = points.len(), "scatter written");
    Ok(())
}

/// One scatter panel per value of `facet`, sharing axes; at most
/// [`MAX_FACETS`] panels, most frequent values first.
pub fn facet_scatter(
    df: &DataFrame,
    x: &str,
    y: &str,
    color_by: &str,
    facet: &str,
    path: &Path,
) -> Result<usize> {
    let data = ScatterPoints::load(df, x, y, color_by)?;
    let facets = group_labels(df, facet)?;

    let mut freq: HashMap<&str, usize> = HashMap::new();
    for f in facets.iter().flatten() {
        *freq.entry(f.as_str()).or_default() += 1;
    }
    let mut panels: Vec<(&str, usize)> = freq.into_iter().collect();
    panels.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
    panels.truncate(MAX_FACETS);
    if panels.is_empty() {
        anyhow::bail!("Facet column '{}' has no non-null values", facet);
    }

    let all = data.complete(|_| true);
    if all.is_empty() {
        anyhow::bail!("No complete rows to plot for {} vs {}", y, x);
    }
    let ranges = (
        padded_bounds(all.iter().map(|p| p.0)),
        padded_bounds(all.iter().map(|p| p.1)),
    );
    let levels = data.levels();

    let cols = (panels.len() as f64).sqrt().ceil() as usize;
    let rows = panels.len().div_ceil(cols);
    let size = (CHART_SIZE.0.max(320 * cols as u32), 280 * rows as u32 + 40);

    let root = SVGBackend::new(path, size).into_drawing_area();
    root.fill(&WHITE)?;
    let root = root.titled(
        &format!("{} vs {} by {}", y, x, facet),
        (FONT, 24),
    )?;
    let areas = root.split_evenly((rows, cols));

    for ((label, _), area) in panels.iter().zip(areas.iter()) {
        let points = data.complete(|i| facets[i].as_deref() == Some(*label));
        draw_points(area, label, x, y, &points, &levels, ranges, false)?;
    }

    root.present()
        .with_context(|| format!("Failed to write chart: {}", path.display()))?;
    debug!(facet, panels = panels.len(), "facet scatter written");
    Ok(panels.len())
}
