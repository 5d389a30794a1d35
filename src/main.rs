use anyhow::{Context, Result};
use hicpclean::{charts, clean, ingest, locate, output, reshape, stats};
use std::env;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();
    info!("startup");

    // ─── 2) locate input + output dirs ───────────────────────────────
    let base_dir = env::current_dir().context("resolving working directory")?;
    let layout = locate::resolve(&base_dir)?;

    // ─── 3) load the workbook ────────────────────────────────────────
    let sheet = ingest::load_sheet(&layout.input_xlsx)?;

    // ─── 4) wide → long ──────────────────────────────────────────────
    let long = reshape::melt(&sheet)?;

    // ─── 5) completeness filter ──────────────────────────────────────
    let table = clean::clean(long);
    if table.rows.is_empty() {
        anyhow::bail!("no observations survived cleaning; the sheet may be empty or malformed");
    }

    // ─── 6) persist the clean table ──────────────────────────────────
    output::write_clean_csv(&table, &layout.clean_csv)?;

    // ─── 7) descriptives + correlation ───────────────────────────────
    let values: Vec<f64> = table.rows.iter().map(|r| r.value).collect();
    let desc = stats::describe(&values).context("empty value column")?;
    output::write_stats_csv(&desc, &layout.out_dir.join("descriptive_stats.csv"))?;

    let pivot = stats::pivot_mean(&table);
    let corr = stats::correlation(&pivot);
    output::write_correlation_csv(&corr, &layout.out_dir.join("correlation.csv"))?;

    // ─── 8) charts ───────────────────────────────────────────────────
    charts::render_all(&pivot, &corr, &layout.out_dir)?;

    info!(
        clean_csv = %layout.clean_csv.display(),
        outputs = %layout.out_dir.display(),
        "all done"
    );
    Ok(())
}
