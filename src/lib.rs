// src/lib.rs
//! One-shot cleaner for Eurostat HICP annual-index spreadsheets: reshapes the
//! wide per-year export into a long observation table, filters it, and emits
//! a clean CSV plus descriptive reports and charts.

pub mod charts;
pub mod clean;
pub mod ingest;
pub mod locate;
pub mod output;
pub mod reshape;
pub mod stats;
