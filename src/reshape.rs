// src/reshape.rs
use anyhow::{bail, Result};
use tracing::info;

use crate::ingest::{Cell, RawSheet};

/// Identifier-column names that mark the country column, normalized form.
const GEO_NAMES: &[&str] = &["geo", "geopolitical entity", "country", "geo\\time", "geotime"];

/// One melted observation. `geo`/`time`/`value` stay optional here; the
/// cleaning pass decides what survives. `extras` aligns with
/// [`LongTable::extra_names`].
#[derive(Debug, Clone)]
pub struct Observation {
    pub geo: Option<String>,
    pub time: Option<i32>,
    pub value: Option<f64>,
    pub extras: Vec<Option<String>>,
}

/// The long-format table: one row per (identifier, year) pair.
#[derive(Debug)]
pub struct LongTable {
    /// Names of the identifier columns other than geo (e.g. "coicop", "unit").
    pub extra_names: Vec<String>,
    pub obs: Vec<Observation>,
}

/// A column is a year column when the first four characters of its label
/// parse as an integer in 1900..=2100.
fn is_year_label(label: &str) -> bool {
    let prefix: String = label.chars().take(4).collect();
    matches!(prefix.trim().parse::<i32>(), Ok(y) if (1900..=2100).contains(&y))
}

fn parse_time(label: &str) -> Option<i32> {
    let t = label.trim();
    t.parse::<i32>()
        .ok()
        .or_else(|| t.parse::<f64>().ok().filter(|f| f.is_finite()).map(|f| f as i32))
}

fn cell_text(cell: &Cell) -> Option<String> {
    if cell.is_empty() {
        None
    } else {
        Some(cell.as_label())
    }
}

/// Melt the wide sheet into one row per (country, year) observation.
///
/// Fails when no year column is present, which usually means header
/// detection landed on the wrong sheet or row.
#[tracing::instrument(level = "info", skip(sheet))]
pub fn melt(sheet: &RawSheet) -> Result<LongTable> {
    let year_cols: Vec<usize> = (0..sheet.headers.len())
        .filter(|&j| is_year_label(&sheet.headers[j]))
        .collect();
    if year_cols.is_empty() {
        bail!("no year columns (e.g. 2016, 2017, ...) detected; check the chosen sheet");
    }

    let id_cols: Vec<usize> = (0..sheet.headers.len())
        .filter(|j| !year_cols.contains(j))
        .collect();
    if id_cols.is_empty() {
        bail!("no identifier columns left after year detection; nothing names the country");
    }

    // First identifier column with a known geo-ish name, else the first one.
    let geo_col = id_cols
        .iter()
        .copied()
        .find(|&j| GEO_NAMES.contains(&sheet.headers[j].trim().to_lowercase().as_str()))
        .unwrap_or(id_cols[0]);
    let extra_cols: Vec<usize> = id_cols.iter().copied().filter(|&j| j != geo_col).collect();
    let extra_names: Vec<String> = extra_cols
        .iter()
        .map(|&j| sheet.headers[j].clone())
        .collect();

    let times: Vec<Option<i32>> = year_cols
        .iter()
        .map(|&j| parse_time(&sheet.headers[j]))
        .collect();

    let mut obs = Vec::with_capacity(sheet.rows.len() * year_cols.len());
    for row in &sheet.rows {
        let geo = cell_text(&row[geo_col]);
        let extras: Vec<Option<String>> = extra_cols.iter().map(|&j| cell_text(&row[j])).collect();
        for (k, &j) in year_cols.iter().enumerate() {
            obs.push(Observation {
                geo: geo.clone(),
                time: times[k],
                value: row[j].as_f64(),
                extras: extras.clone(),
            });
        }
    }

    info!(
        years = year_cols.len(),
        ids = id_cols.len(),
        geo = %sheet.headers[geo_col],
        observations = obs.len(),
        "melted wide sheet to long"
    );
    Ok(LongTable { extra_names, obs })
}
