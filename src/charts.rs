// src/charts.rs
use anyhow::{bail, Result};
use plotters::prelude::*;
use std::path::Path;
use tracing::{info, warn};

use crate::stats::{CorrMatrix, Pivot};

const BAR_SIZE: (u32, u32) = (2000, 1200);
const HEATMAP_SIZE: (u32, u32) = (2000, 1600);

/// Mean value per country in `year`, sorted descending. Countries without
/// an observation that year are left out.
fn means_for_year(pivot: &Pivot, year: i32) -> Vec<(String, f64)> {
    let Some(row) = pivot.years.iter().position(|&y| y == year) else {
        return Vec::new();
    };
    let mut out: Vec<(String, f64)> = pivot
        .geos
        .iter()
        .zip(&pivot.cells[row])
        .filter_map(|(g, v)| v.map(|v| (g.clone(), v)))
        .collect();
    out.sort_by(|a, b| b.1.total_cmp(&a.1));
    out
}

/// Smallest span covering `values`, with 5% padding. Empty input collapses
/// to a thin band around zero.
fn y_span(values: impl Iterator<Item = f64>) -> (f64, f64) {
    let (mut lo, mut hi) = (f64::INFINITY, f64::NEG_INFINITY);
    for v in values {
        lo = lo.min(v);
        hi = hi.max(v);
    }
    if lo > hi {
        (lo, hi) = (0.0, 0.0);
    }
    let pad = ((hi - lo) * 0.05).max(0.1);
    (lo - pad, hi + pad)
}

fn bar_chart(path: &Path, title: &str, y_desc: &str, bars: &[(String, f64)]) -> Result<()> {
    let root = BitMapBackend::new(path, BAR_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = bars.len() as i32;
    // bars grow from zero, so the axis must include it
    let (ymin, ymax) = y_span(bars.iter().map(|b| b.1).chain(std::iter::once(0.0)));

    let mut chart = ChartBuilder::on(&root)
        .caption(title, ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(120)
        .y_label_area_size(80)
        .build_cartesian_2d((0..n).into_segmented(), ymin..ymax)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .x_labels(bars.len())
        .x_label_formatter(&|x| match x {
            SegmentValue::CenterOf(i) => bars
                .get(*i as usize)
                .map(|(g, _)| g.clone())
                .unwrap_or_default(),
            _ => String::new(),
        })
        .x_label_style(
            ("sans-serif", 18)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_desc(y_desc)
        .draw()?;

    chart.draw_series(
        Histogram::vertical(&chart)
            .style(BLUE.mix(0.6).filled())
            .data(bars.iter().enumerate().map(|(i, (_, v))| (i as i32, *v))),
    )?;

    root.present()?;
    Ok(())
}

fn top5_lines(path: &Path, pivot: &Pivot, top: &[(String, f64)], latest: i32) -> Result<()> {
    let root = BitMapBackend::new(path, BAR_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let cols: Vec<usize> = top
        .iter()
        .filter_map(|(g, _)| pivot.geos.iter().position(|p| p == g))
        .collect();

    let (x0, x1) = (pivot.years[0], *pivot.years.last().unwrap_or(&latest));
    // a single year has no span to draw across; widen by one on each side
    let (x0, x1) = if x0 == x1 { (x0 - 1, x1 + 1) } else { (x0, x1) };
    let (ymin, ymax) = y_span(
        cols.iter()
            .flat_map(|&j| pivot.cells.iter().filter_map(move |row| row[j])),
    );

    let mut chart = ChartBuilder::on(&root)
        .caption(
            format!("HICP trend, top 5 countries of {latest}"),
            ("sans-serif", 40),
        )
        .margin(20)
        .x_label_area_size(60)
        .y_label_area_size(80)
        .build_cartesian_2d(x0..x1, ymin..ymax)?;

    chart
        .configure_mesh()
        .x_desc("year")
        .y_desc("%")
        .x_label_formatter(&|y| y.to_string())
        .draw()?;

    for (k, &j) in cols.iter().enumerate() {
        let color = Palette99::pick(k).to_rgba();
        let series: Vec<(i32, f64)> = pivot
            .years
            .iter()
            .zip(&pivot.cells)
            .filter_map(|(&y, row)| row[j].map(|v| (y, v)))
            .collect();
        chart
            .draw_series(LineSeries::new(series, color.stroke_width(3)))?
            .label(pivot.geos[j].clone())
            .legend(move |(x, y)| {
                PathElement::new(vec![(x, y), (x + 20, y)], color.stroke_width(3))
            });
    }

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .label_font(("sans-serif", 24))
        .draw()?;

    root.present()?;
    Ok(())
}

/// Blue-white-red ramp over [-1, 1].
fn corr_color(r: f64) -> RGBColor {
    const BLUE_END: (f64, f64, f64) = (33.0, 102.0, 172.0);
    const WHITE_MID: (f64, f64, f64) = (247.0, 247.0, 247.0);
    const RED_END: (f64, f64, f64) = (178.0, 24.0, 43.0);

    let t = r.clamp(-1.0, 1.0);
    let (from, to, f) = if t < 0.0 {
        (BLUE_END, WHITE_MID, t + 1.0)
    } else {
        (WHITE_MID, RED_END, t)
    };
    RGBColor(
        (from.0 + (to.0 - from.0) * f).round() as u8,
        (from.1 + (to.1 - from.1) * f).round() as u8,
        (from.2 + (to.2 - from.2) * f).round() as u8,
    )
}

fn heatmap(path: &Path, corr: &CorrMatrix) -> Result<()> {
    let root = BitMapBackend::new(path, HEATMAP_SIZE).into_drawing_area();
    root.fill(&WHITE)?;

    let n = corr.labels.len() as i32;
    let mut chart = ChartBuilder::on(&root)
        .caption("Cross-country correlation (HICP)", ("sans-serif", 40))
        .margin(20)
        .x_label_area_size(120)
        .y_label_area_size(120)
        .build_cartesian_2d(0..n, 0..n)?;

    let label = |idx: &i32| {
        corr.labels
            .get(*idx as usize)
            .cloned()
            .unwrap_or_default()
    };
    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_labels(corr.labels.len())
        .y_labels(corr.labels.len())
        .x_label_formatter(&label)
        .y_label_formatter(&label)
        .x_label_style(
            ("sans-serif", 16)
                .into_font()
                .transform(FontTransform::Rotate90),
        )
        .y_label_style(("sans-serif", 16))
        .draw()?;

    chart.draw_series(corr.cells.iter().enumerate().flat_map(|(i, row)| {
        row.iter().enumerate().filter_map(move |(j, c)| {
            c.map(|r| {
                Rectangle::new(
                    [(i as i32, j as i32), (i as i32 + 1, j as i32 + 1)],
                    corr_color(r).filled(),
                )
            })
        })
    }))?;

    root.present()?;
    Ok(())
}

/// Render the four report charts into `out_dir`.
#[tracing::instrument(level = "info", skip(pivot, corr, out_dir), fields(out = %out_dir.display()))]
pub fn render_all(pivot: &Pivot, corr: &CorrMatrix, out_dir: &Path) -> Result<()> {
    let Some(&latest) = pivot.years.last() else {
        bail!("no years to chart");
    };

    // 1) mean per country, latest year
    let by_country = means_for_year(pivot, latest);
    bar_chart(
        &out_dir.join("g1_inflation_by_country.png"),
        &format!("Mean inflation by country, {latest}"),
        "%",
        &by_country,
    )?;

    // 2) trend lines for the five leaders of chart 1
    let top: Vec<(String, f64)> = by_country.iter().take(5).cloned().collect();
    top5_lines(&out_dir.join("g2_top5_trend.png"), pivot, &top, latest)?;

    // 3) correlation heatmap
    heatmap(&out_dir.join("g3_correlation_matrix.png"), corr)?;

    // 4) year-over-year change, latest vs previous
    let prev = latest - 1;
    let prev_means = means_for_year(pivot, prev);
    let mut delta: Vec<(String, f64)> = by_country
        .iter()
        .filter_map(|(g, cur)| {
            prev_means
                .iter()
                .find(|(pg, _)| pg == g)
                .map(|(_, p)| (g.clone(), cur - p))
        })
        .collect();
    delta.sort_by(|a, b| b.1.total_cmp(&a.1));

    if delta.is_empty() {
        warn!(latest, prev, "no countries present in both years; skipping change chart");
    } else {
        bar_chart(
            &out_dir.join("g4_yearly_change.png"),
            &format!("Year-over-year change, {latest} vs {prev}"),
            "Δ percentage points",
            &delta,
        )?;
    }

    info!("charts rendered");
    Ok(())
}
