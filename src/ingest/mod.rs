// src/ingest/mod.rs
use anyhow::{Context, Result};
use calamine::{open_workbook, Data, Reader, Xlsx};
use std::path::Path;
use tracing::{info, warn};

pub mod header;

/// One spreadsheet cell, reduced to the three shapes the cleaner cares about.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }

    /// String form of the cell, the way a header label would read. Whole
    /// numbers render without a fractional part so a numeric `2016` cell
    /// matches the 4-digit year token.
    pub fn as_label(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => {
                if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.0e15 {
                    format!("{}", *n as i64)
                } else {
                    format!("{}", n)
                }
            }
        }
    }

    /// Numeric coercion: numbers pass through, text is parsed after trimming.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Empty => None,
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
        }
    }
}

/// The selected sheet after header detection and empty-padding removal:
/// column labels from the detected header row, data rows below it.
#[derive(Debug)]
pub struct RawSheet {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

fn convert(data: &Data) -> Cell {
    match data {
        Data::Empty | Data::Error(_) => Cell::Empty,
        Data::Float(f) => Cell::Number(*f),
        Data::Int(i) => Cell::Number(*i as f64),
        Data::String(s) => Cell::Text(s.clone()),
        Data::Bool(b) => Cell::Text(b.to_string()),
        Data::DateTime(dt) => Cell::Number(dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Cell::Text(s.clone()),
    }
}

/// Eurostat exports carry a "Summary" sheet ahead of the data; pick the first
/// sheet that is not it.
fn pick_sheet(names: &[String]) -> Option<String> {
    names
        .iter()
        .find(|s| s.trim().to_lowercase() != "summary")
        .or_else(|| names.first())
        .cloned()
}

/// Open `path`, choose the data sheet, detect its header row, and return the
/// trimmed grid. Fails if the file is missing, unreadable, or has no sheets.
#[tracing::instrument(level = "info", skip(path), fields(path = %path.as_ref().display()))]
pub fn load_sheet<P: AsRef<Path>>(path: P) -> Result<RawSheet> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> = open_workbook(path)
        .with_context(|| format!("failed to open workbook {}", path.display()))?;

    let names = workbook.sheet_names().to_owned();
    info!(sheets = ?names, "workbook opened");
    let sheet = pick_sheet(&names)
        .with_context(|| format!("workbook {} contains no sheets", path.display()))?;

    let range = workbook
        .worksheet_range(&sheet)
        .with_context(|| format!("failed to read sheet {:?}", sheet))?;

    let grid: Vec<Vec<Cell>> = range
        .rows()
        .map(|row| row.iter().map(convert).collect())
        .collect();

    let sheet = from_grid(grid);
    info!(
        rows = sheet.rows.len(),
        cols = sheet.headers.len(),
        "raw sheet loaded"
    );
    Ok(sheet)
}

/// Header detection plus removal of the all-empty rows and columns these
/// sheets tend to be padded with. Exposed separately so the heuristic can be
/// exercised without a workbook on disk.
pub fn from_grid(grid: Vec<Vec<Cell>>) -> RawSheet {
    let header_row = match header::detect_header_row(&grid) {
        Some((row, score)) if score > 0 => {
            info!(row, score, "header row detected");
            row
        }
        _ => {
            warn!("no clear header row found; using the first row");
            0
        }
    };

    let headers_raw: Vec<Cell> = grid.get(header_row).cloned().unwrap_or_default();
    let width = grid
        .iter()
        .skip(header_row)
        .map(|r| r.len())
        .max()
        .unwrap_or(0)
        .max(headers_raw.len());

    // Data rows below the header, padded to a rectangle, all-empty rows gone.
    let mut rows: Vec<Vec<Cell>> = grid
        .into_iter()
        .skip(header_row + 1)
        .map(|mut r| {
            r.resize(width, Cell::Empty);
            r
        })
        .filter(|r| r.iter().any(|c| !c.is_empty()))
        .collect();

    // Keep only columns that hold a value in at least one data row.
    let keep: Vec<usize> = (0..width)
        .filter(|&j| rows.iter().any(|r| !r[j].is_empty()))
        .collect();

    let headers: Vec<String> = keep
        .iter()
        .map(|&j| headers_raw.get(j).map(Cell::as_label).unwrap_or_default())
        .collect();
    rows = rows
        .into_iter()
        .map(|r| keep.iter().map(|&j| r[j].clone()).collect())
        .collect();

    RawSheet { headers, rows }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::{EnvFilter, FmtSubscriber};

    fn init_test_logging() {
        let subscriber = FmtSubscriber::builder()
            .with_env_filter(
                EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| EnvFilter::new("info,hicpclean::ingest=debug")),
            )
            .with_test_writer()
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    fn t(s: &str) -> Cell {
        Cell::Text(s.to_string())
    }

    #[test]
    fn label_renders_whole_numbers_without_fraction() {
        assert_eq!(Cell::Number(2016.0).as_label(), "2016");
        assert_eq!(Cell::Number(2.5).as_label(), "2.5");
        assert_eq!(Cell::Empty.as_label(), "");
    }

    #[test]
    fn numeric_coercion_parses_text() {
        assert_eq!(Cell::Text(" 101.3 ".into()).as_f64(), Some(101.3));
        assert_eq!(Cell::Text(":".into()).as_f64(), None);
        assert_eq!(Cell::Number(4.0).as_f64(), Some(4.0));
    }

    #[test]
    fn picks_first_non_summary_sheet() {
        let names = vec![
            "Summary".to_string(),
            "Sheet 1".to_string(),
            "Sheet 2".to_string(),
        ];
        assert_eq!(pick_sheet(&names).as_deref(), Some("Sheet 1"));
        assert_eq!(
            pick_sheet(&["Summary".to_string()]).as_deref(),
            Some("Summary")
        );
        assert_eq!(pick_sheet(&[]), None);
    }

    #[test]
    fn from_grid_skips_title_rows_and_empty_padding() {
        init_test_logging();
        let grid = vec![
            vec![t("HICP (2015 = 100) - annual data")],
            vec![],
            vec![t("geo"), t("2016"), t("2017"), Cell::Empty],
            vec![t("ES"), Cell::Number(100.2), Cell::Number(102.1), Cell::Empty],
            vec![Cell::Empty, Cell::Empty, Cell::Empty, Cell::Empty],
            vec![t("FR"), Cell::Number(100.9), Cell::Number(101.8)],
        ];

        let sheet = from_grid(grid);
        assert_eq!(sheet.headers, vec!["geo", "2016", "2017"]);
        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[1][0], t("FR"));
        assert_eq!(sheet.rows[1][2], Cell::Number(101.8));
    }

    #[test]
    fn from_grid_falls_back_to_first_row() {
        let grid = vec![
            vec![t("alpha"), t("beta")],
            vec![t("a"), Cell::Number(1.0)],
        ];
        let sheet = from_grid(grid);
        assert_eq!(sheet.headers, vec!["alpha", "beta"]);
        assert_eq!(sheet.rows.len(), 1);
    }
}
