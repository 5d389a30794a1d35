// src/output.rs
use anyhow::{Context, Result};
use csv::Writer;
use std::path::Path;
use tracing::info;

use crate::clean::CleanTable;
use crate::stats::{CorrMatrix, Describe};

/// Identifier columns kept in the cleaned CSV when present, in this order
/// after geo/time/value.
const PREFERRED_EXTRAS: &[&str] = &["coicop", "unit"];

fn fmt_f64(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        format!("{}", v)
    }
}

/// Write the cleaned table as UTF-8 CSV: `geo,time,value` plus whichever of
/// the preferred identifier columns the sheet carried.
pub fn write_clean_csv(table: &CleanTable, path: &Path) -> Result<()> {
    let extras: Vec<usize> = PREFERRED_EXTRAS
        .iter()
        .filter_map(|name| table.extra_names.iter().position(|n| n == name))
        .collect();

    let mut wtr =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec!["geo".to_string(), "time".into(), "value".into()];
    header.extend(extras.iter().map(|&j| table.extra_names[j].clone()));
    wtr.write_record(&header)?;

    for row in &table.rows {
        let mut rec = vec![row.geo.clone(), row.time.to_string(), fmt_f64(row.value)];
        rec.extend(
            extras
                .iter()
                .map(|&j| row.extras[j].clone().unwrap_or_default()),
        );
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;

    info!(rows = table.rows.len(), path = %path.display(), "wrote clean CSV");
    Ok(())
}

/// Write the value-column descriptives as `statistic,value` rows.
pub fn write_stats_csv(desc: &Describe, path: &Path) -> Result<()> {
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    wtr.write_record(["statistic", "value"])?;
    wtr.write_record(["count", &desc.count.to_string()])?;
    for (name, v) in [
        ("mean", desc.mean),
        ("std", desc.std),
        ("min", desc.min),
        ("25%", desc.p25),
        ("50%", desc.p50),
        ("75%", desc.p75),
        ("max", desc.max),
    ] {
        wtr.write_record([name, &fmt_f64(v)])?;
    }
    wtr.flush()?;

    info!(path = %path.display(), "wrote descriptive statistics");
    Ok(())
}

/// Write the correlation matrix with country labels on both axes; cells
/// without a defined correlation stay empty.
pub fn write_correlation_csv(corr: &CorrMatrix, path: &Path) -> Result<()> {
    let mut wtr =
        Writer::from_path(path).with_context(|| format!("creating {}", path.display()))?;

    let mut header = vec![String::new()];
    header.extend(corr.labels.iter().cloned());
    wtr.write_record(&header)?;

    for (label, row) in corr.labels.iter().zip(&corr.cells) {
        let mut rec = vec![label.clone()];
        rec.extend(row.iter().map(|c| c.map(fmt_f64).unwrap_or_default()));
        wtr.write_record(&rec)?;
    }
    wtr.flush()?;

    info!(countries = corr.labels.len(), path = %path.display(), "wrote correlation matrix");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::CleanObs;
    use anyhow::Result;
    use std::fs;
    use tempfile::tempdir;

    fn sample_table(extra_names: Vec<String>, extras: Vec<Option<String>>) -> CleanTable {
        CleanTable {
            extra_names,
            rows: vec![CleanObs {
                geo: "ES".into(),
                time: 2020,
                value: -0.3,
                extras,
            }],
        }
    }

    #[test]
    fn clean_csv_keeps_preferred_extras_in_order() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("clean.csv");

        // sheet order is unit-before-coicop; output must be coicop,unit
        let table = sample_table(
            vec!["unit".into(), "note".into(), "coicop".into()],
            vec![Some("I15".into()), Some("x".into()), Some("CP00".into())],
        );
        write_clean_csv(&table, &path)?;

        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("geo,time,value,coicop,unit"));
        assert_eq!(lines.next(), Some("ES,2020,-0.3,CP00,I15"));
        Ok(())
    }

    #[test]
    fn clean_csv_without_extras() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("clean.csv");
        write_clean_csv(&sample_table(vec![], vec![]), &path)?;
        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("geo,time,value\n"));
        Ok(())
    }

    #[test]
    fn correlation_csv_blanks_missing_cells() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("corr.csv");
        let corr = CorrMatrix {
            labels: vec!["A".into(), "B".into()],
            cells: vec![vec![Some(1.0), None], vec![None, Some(1.0)]],
        };
        write_correlation_csv(&corr, &path)?;
        let text = fs::read_to_string(&path)?;
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(",A,B"));
        assert_eq!(lines.next(), Some("A,1,"));
        assert_eq!(lines.next(), Some("B,,1"));
        Ok(())
    }

    #[test]
    fn stats_csv_layout() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("stats.csv");
        let desc = crate::stats::describe(&[1.0, 2.0, 3.0]).unwrap();
        write_stats_csv(&desc, &path)?;
        let text = fs::read_to_string(&path)?;
        assert!(text.starts_with("statistic,value\ncount,3\nmean,2\n"));
        assert!(text.contains("50%,2\n"));
        Ok(())
    }
}
