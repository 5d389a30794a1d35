// src/locate.rs
use anyhow::{bail, Context, Result};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// File name Eurostat gives the annual HICP export.
pub const INPUT_FILE: &str = "prc_hicp_aind.xlsx";

/// Environment variable that overrides the directory search with an
/// explicit workbook path. Handy when the data folder has spaces in it.
pub const ENV_XLSX_PATH: &str = "HICP_XLSX_PATH";

/// Directories searched for [`INPUT_FILE`], relative to the base dir.
const CANDIDATE_DIRS: &[&str] = &["data", "Data", "data base", "../data", "."];

/// Resolved input/output layout for one run.
#[derive(Debug)]
pub struct Layout {
    pub input_xlsx: PathBuf,
    /// Where the cleaned CSV lands, next to the input.
    pub clean_csv: PathBuf,
    /// Reports and charts.
    pub out_dir: PathBuf,
}

/// Locate the input workbook and prepare the output directories.
pub fn resolve(base_dir: &Path) -> Result<Layout> {
    resolve_with(base_dir, env::var_os(ENV_XLSX_PATH).map(PathBuf::from))
}

fn resolve_with(base_dir: &Path, env_override: Option<PathBuf>) -> Result<Layout> {
    let input_xlsx = match env_override {
        Some(p) if p.is_file() => {
            info!(path = %p.display(), "using workbook from {}", ENV_XLSX_PATH);
            p
        }
        _ => {
            let candidates: Vec<PathBuf> = CANDIDATE_DIRS
                .iter()
                .map(|d| base_dir.join(d).join(INPUT_FILE))
                .collect();
            match candidates.iter().find(|p| p.is_file()) {
                Some(p) => p.clone(),
                None => {
                    let searched: Vec<String> =
                        candidates.iter().map(|p| p.display().to_string()).collect();
                    bail!(
                        "cannot find {INPUT_FILE}; searched:\n  {}\n\
                         place the file in one of those directories or point \
                         {ENV_XLSX_PATH} at it",
                        searched.join("\n  ")
                    );
                }
            }
        }
    };

    let data_dir = input_xlsx
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| base_dir.to_path_buf());
    let out_dir = base_dir.join("outputs");
    fs::create_dir_all(&out_dir)
        .with_context(|| format!("creating output dir {}", out_dir.display()))?;

    info!(
        input = %input_xlsx.display(),
        outputs = %out_dir.display(),
        "resolved layout"
    );
    Ok(Layout {
        clean_csv: data_dir.join("hicp_clean.csv"),
        input_xlsx,
        out_dir,
    })
}
