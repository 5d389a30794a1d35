// src/ingest/header.rs
use once_cell::sync::Lazy;
use regex::Regex;

use super::Cell;

/// A cell whose whole string form is a 4-digit year token, e.g. "2016".
static YEAR_TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\s*\d{4}\s*$").expect("static regex"));

/// How many leading rows of a sheet are scanned for the header row.
pub const SCAN_ROWS: usize = 20;

/// Score one row as a header candidate: +1 per 4-digit year cell, +2 if any
/// cell mentions "time", +2 if any cell mentions "geo"/"country"/"geopolitical".
pub fn score_row(cells: &[Cell]) -> u32 {
    let labels: Vec<String> = cells.iter().map(|c| c.as_label()).collect();

    let year_count = labels.iter().filter(|v| YEAR_TOKEN.is_match(v)).count() as u32;

    let lowered: Vec<String> = labels.iter().map(|v| v.trim().to_lowercase()).collect();
    let mut label_score = 0;
    if lowered.iter().any(|v| v.contains("time")) {
        label_score += 2;
    }
    if lowered
        .iter()
        .any(|v| v.contains("geo") || v.contains("country") || v.contains("geopolitical"))
    {
        label_score += 2;
    }

    year_count + label_score
}

/// Scan the first [`SCAN_ROWS`] rows of the grid and return the best-scoring
/// row index with its score. Ties keep the earliest row. Returns `None` for an
/// empty grid; a score of 0 means no row looked like a header at all.
pub fn detect_header_row(grid: &[Vec<Cell>]) -> Option<(usize, u32)> {
    let mut best: Option<(usize, u32)> = None;
    for (i, row) in grid.iter().take(SCAN_ROWS).enumerate() {
        let score = score_row(row);
        match best {
            Some((_, max)) if score <= max => {}
            _ => best = Some((i, score)),
        }
    }
    best
}
