// src/clean.rs
use tracing::info;

use crate::reshape::{LongTable, Observation};

/// An observation with a missing fraction above this is discarded.
pub const MAX_MISSING_RATIO: f64 = 0.49;

/// A fully-populated observation after cleaning.
#[derive(Debug, Clone)]
pub struct CleanObs {
    pub geo: String,
    pub time: i32,
    pub value: f64,
    pub extras: Vec<Option<String>>,
}

#[derive(Debug)]
pub struct CleanTable {
    pub extra_names: Vec<String>,
    pub rows: Vec<CleanObs>,
}

fn missing_fields(obs: &Observation) -> usize {
    obs.geo.is_none() as usize
        + obs.time.is_none() as usize
        + obs.value.is_none() as usize
        + obs.extras.iter().filter(|e| e.is_none()).count()
}

/// Minimal completeness filter: drop all-empty observations, drop any with
/// more than [`MAX_MISSING_RATIO`] of its fields missing, and require
/// `geo`, `time`, and `value` to be present.
#[tracing::instrument(level = "info", skip(long))]
pub fn clean(long: LongTable) -> CleanTable {
    let before = long.obs.len();
    let fields = 3 + long.extra_names.len();

    let rows: Vec<CleanObs> = long
        .obs
        .into_iter()
        .filter(|o| {
            let missing = missing_fields(o);
            missing < fields && (missing as f64 / fields as f64) <= MAX_MISSING_RATIO
        })
        .filter_map(|o| {
            Some(CleanObs {
                geo: o.geo?,
                time: o.time?,
                value: o.value?,
                extras: o.extras,
            })
        })
        .collect();

    info!(before, after = rows.len(), "cleaned long table");
    CleanTable {
        extra_names: long.extra_names,
        rows,
    }
}
