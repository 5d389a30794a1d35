// src/stats.rs
use rayon::prelude::*;
use std::collections::BTreeMap;
use tracing::info;

use crate::clean::CleanTable;

/// Summary of the value column, `describe`-style.
#[derive(Debug, Clone, PartialEq)]
pub struct Describe {
    pub count: usize,
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub p25: f64,
    pub p50: f64,
    pub p75: f64,
    pub max: f64,
}

/// Linearly-interpolated percentile, `q` in 0..=1. `sorted` must be
/// ascending and non-empty.
fn percentile(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let rank = q * (n - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Descriptive statistics of `values`; `None` when empty. `std` is the
/// sample standard deviation (n − 1), NaN for a single observation.
pub fn describe(values: &[f64]) -> Option<Describe> {
    if values.is_empty() {
        return None;
    }
    let n = values.len();
    let mean = values.iter().sum::<f64>() / n as f64;
    let std = if n > 1 {
        (values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64).sqrt()
    } else {
        f64::NAN
    };

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    Some(Describe {
        count: n,
        mean,
        std,
        min: sorted[0],
        p25: percentile(&sorted, 0.25),
        p50: percentile(&sorted, 0.50),
        p75: percentile(&sorted, 0.75),
        max: sorted[n - 1],
    })
}

/// Years × countries matrix of mean values, the pivot the correlation and
/// the line chart are computed from. Rows follow `years`, columns `geos`,
/// both sorted ascending.
#[derive(Debug)]
pub struct Pivot {
    pub years: Vec<i32>,
    pub geos: Vec<String>,
    pub cells: Vec<Vec<Option<f64>>>,
}

pub fn pivot_mean(table: &CleanTable) -> Pivot {
    let mut sums: BTreeMap<(i32, &str), (f64, usize)> = BTreeMap::new();
    for r in &table.rows {
        let e = sums.entry((r.time, r.geo.as_str())).or_insert((0.0, 0));
        e.0 += r.value;
        e.1 += 1;
    }

    let mut years: Vec<i32> = sums.keys().map(|(t, _)| *t).collect();
    years.sort_unstable();
    years.dedup();
    let mut geos: Vec<String> = sums.keys().map(|(_, g)| g.to_string()).collect();
    geos.sort();
    geos.dedup();

    let cells = years
        .iter()
        .map(|&t| {
            geos.iter()
                .map(|g| sums.get(&(t, g.as_str())).map(|(s, n)| s / *n as f64))
                .collect()
        })
        .collect();

    Pivot { years, geos, cells }
}

/// Country × country Pearson correlation matrix.
#[derive(Debug)]
pub struct CorrMatrix {
    pub labels: Vec<String>,
    /// `cells[i][j]` is the correlation between countries i and j, `None`
    /// when fewer than two shared years exist or a series is constant.
    pub cells: Vec<Vec<Option<f64>>>,
}

fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();
    if pairs.len() < 2 {
        return None;
    }
    let n = pairs.len() as f64;
    let mx = pairs.iter().map(|(x, _)| x).sum::<f64>() / n;
    let my = pairs.iter().map(|(_, y)| y).sum::<f64>() / n;
    let mut cov = 0.0;
    let mut vx = 0.0;
    let mut vy = 0.0;
    for (x, y) in &pairs {
        cov += (x - mx) * (y - my);
        vx += (x - mx).powi(2);
        vy += (y - my).powi(2);
    }
    if vx == 0.0 || vy == 0.0 {
        return None;
    }
    Some(cov / (vx.sqrt() * vy.sqrt()))
}

/// Pearson correlation between every pair of countries over the years both
/// observed. The pair sweep is parallelized per country.
pub fn correlation(pivot: &Pivot) -> CorrMatrix {
    let n = pivot.geos.len();
    let columns: Vec<Vec<Option<f64>>> = (0..n)
        .map(|j| pivot.cells.iter().map(|row| row[j]).collect())
        .collect();

    let cells: Vec<Vec<Option<f64>>> = (0..n)
        .into_par_iter()
        .map(|i| {
            (0..n)
                .map(|j| {
                    if i == j {
                        columns[i].iter().any(Option::is_some).then_some(1.0)
                    } else {
                        pearson(&columns[i], &columns[j])
                    }
                })
                .collect()
        })
        .collect();

    info!(countries = n, "computed correlation matrix");
    CorrMatrix {
        labels: pivot.geos.clone(),
        cells,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clean::CleanObs;

    fn table(rows: &[(&str, i32, f64)]) -> CleanTable {
        CleanTable {
            extra_names: vec![],
            rows: rows
                .iter()
                .map(|(g, t, v)| CleanObs {
                    geo: g.to_string(),
                    time: *t,
                    value: *v,
                    extras: vec![],
                })
                .collect(),
        }
    }

    #[test]
    fn describe_matches_hand_computed_values() {
        let d = describe(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(d.count, 4);
        assert!((d.mean - 2.5).abs() < 1e-12);
        // sample std of 1..4 is sqrt(5/3)
        assert!((d.std - (5.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(d.min, 1.0);
        assert!((d.p25 - 1.75).abs() < 1e-12);
        assert!((d.p50 - 2.5).abs() < 1e-12);
        assert!((d.p75 - 3.25).abs() < 1e-12);
        assert_eq!(d.max, 4.0);
    }

    #[test]
    fn describe_empty_and_singleton() {
        assert!(describe(&[]).is_none());
        let d = describe(&[7.5]).unwrap();
        assert_eq!(d.count, 1);
        assert_eq!(d.p50, 7.5);
        assert!(d.std.is_nan());
    }

    #[test]
    fn pivot_averages_duplicate_cells() {
        let t = table(&[
            ("ES", 2020, 1.0),
            ("ES", 2020, 3.0),
            ("FR", 2020, 2.0),
            ("FR", 2021, 4.0),
        ]);
        let p = pivot_mean(&t);
        assert_eq!(p.years, vec![2020, 2021]);
        assert_eq!(p.geos, vec!["ES", "FR"]);
        assert_eq!(p.cells[0][0], Some(2.0)); // mean of 1 and 3
        assert_eq!(p.cells[1][0], None); // ES has no 2021
        assert_eq!(p.cells[1][1], Some(4.0));
    }

    #[test]
    fn perfectly_correlated_and_anticorrelated_series() {
        let t = table(&[
            ("A", 2019, 1.0),
            ("A", 2020, 2.0),
            ("A", 2021, 3.0),
            ("B", 2019, 2.0),
            ("B", 2020, 4.0),
            ("B", 2021, 6.0),
            ("C", 2019, 3.0),
            ("C", 2020, 2.0),
            ("C", 2021, 1.0),
        ]);
        let corr = correlation(&pivot_mean(&t));
        assert_eq!(corr.labels, vec!["A", "B", "C"]);
        let ab = corr.cells[0][1].unwrap();
        let ac = corr.cells[0][2].unwrap();
        assert!((ab - 1.0).abs() < 1e-12);
        assert!((ac + 1.0).abs() < 1e-12);
        assert_eq!(corr.cells[0][0], Some(1.0));
        // symmetry
        assert_eq!(corr.cells[1][0], corr.cells[0][1]);
    }

    #[test]
    fn short_or_constant_overlap_yields_missing() {
        let t = table(&[
            ("A", 2020, 1.0),
            ("A", 2021, 2.0),
            ("B", 2021, 5.0), // one shared year only
            ("C", 2020, 3.0),
            ("C", 2021, 3.0), // constant series
        ]);
        let corr = correlation(&pivot_mean(&t));
        assert_eq!(corr.cells[0][1], None);
        assert_eq!(corr.cells[0][2], None);
        // constant series still correlates perfectly with itself by
        // convention here: it has observations
        assert_eq!(corr.cells[2][2], Some(1.0));
    }
}
