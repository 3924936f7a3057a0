//! Export: CSV, Parquet and JSON artifacts for a finished run.
//!
//! Every CSV has a header row with canonical column names and renders a
//! missing value as `NA`. Apart from the append-only history file, all
//! artifacts are rewritten in full each run, so an unchanged input directory
//! produces byte-identical files.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{ensure, Context, Result};
use polars::prelude::*;
use pricelist_core::analytics::{CompanyAggregate, CorrelationMatrix, DateAggregate, ReturnPoint};
use pricelist_core::data::{DatasetSchema, LongitudinalDataset};
use pricelist_core::domain::CanonicalColumn;

use crate::config::OutputConfig;
use crate::pipeline::PipelineOutput;

/// Rendering of "no value" in every CSV.
pub const NA: &str = "NA";

pub fn format_value(value: Option<f64>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => NA.to_string(),
    }
}

fn finish_csv(wtr: csv::Writer<Vec<u8>>) -> Result<String> {
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Merged dataset with per-company return columns.
///
/// Columns: date, symbol, the dataset's numeric columns in canonical order,
/// daily_change, cumulative_return, day
pub fn export_merged_csv(dataset: &LongitudinalDataset, returns: &[ReturnPoint]) -> Result<String> {
    ensure!(
        dataset.len() == returns.len(),
        "return series has {} rows, dataset has {}",
        returns.len(),
        dataset.len()
    );
    let columns: Vec<CanonicalColumn> = dataset.columns().collect();

    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["date", "symbol"];
    header.extend(columns.iter().map(|c| c.name()));
    header.extend(["daily_change", "cumulative_return", "day"]);
    wtr.write_record(&header)?;

    for (record, point) in dataset.iter().zip(returns) {
        ensure!(
            record.key() == (point.date, point.symbol.as_str()),
            "return series out of step with dataset at ({}, {})",
            record.date,
            record.symbol
        );
        let mut row = vec![record.date.to_string(), record.symbol.clone()];
        row.extend(columns.iter().map(|&c| format_value(record.value(c))));
        row.push(format_value(point.daily_change));
        row.push(format_value(point.cumulative_return));
        row.push(point.day.to_string());
        wtr.write_record(&row)?;
    }
    finish_csv(wtr)
}

/// Per-company aggregates, most traded first. Companies without any volume
/// come last, by symbol.
pub fn export_summary_csv(companies: &[CompanyAggregate]) -> Result<String> {
    let mut ranked: Vec<&CompanyAggregate> = companies.iter().collect();
    ranked.sort_by(|a, b| match (a.total_volume, b.total_volume) {
        (Some(x), Some(y)) => y.total_cmp(&x).then_with(|| a.symbol.cmp(&b.symbol)),
        (Some(_), None) => std::cmp::Ordering::Less,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (None, None) => a.symbol.cmp(&b.symbol),
    });

    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "symbol",
        "observations",
        "total_volume",
        "average_close",
        "first_date",
        "last_date",
    ])?;
    for (i, c) in ranked.iter().enumerate() {
        wtr.write_record([
            &(i + 1).to_string(),
            &c.symbol,
            &c.observations.to_string(),
            &format_value(c.total_volume),
            &format_value(c.average_close),
            &c.first_date.to_string(),
            &c.last_date.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

/// Per-date market aggregates.
pub fn export_daily_csv(daily: &[DateAggregate]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "date",
        "companies",
        "total_volume",
        "volume_reporters",
        "average_close",
        "close_reporters",
    ])?;
    for d in daily {
        wtr.write_record([
            &d.date.to_string(),
            &d.companies.to_string(),
            &format_value(d.total_volume),
            &d.volume_reporters.to_string(),
            &format_value(d.average_close),
            &d.close_reporters.to_string(),
        ])?;
    }
    finish_csv(wtr)
}

/// Correlation matrix with the column names down the first column.
pub fn export_correlation_csv(matrix: &CorrelationMatrix) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    let mut header = vec!["column"];
    header.extend(matrix.columns.iter().map(|c| c.name()));
    wtr.write_record(&header)?;
    for (column, values) in matrix.columns.iter().zip(&matrix.values) {
        let mut row = vec![column.name().to_string()];
        row.extend(values.iter().map(|&v| format_value(v)));
        wtr.write_record(&row)?;
    }
    finish_csv(wtr)
}

// ─── History file ───────────────────────────────────────────────────

/// Columns of the history file. Fixed, so rows appended by runs over
/// different layouts still line up.
const HISTORY_COLUMNS: [CanonicalColumn; 5] = CanonicalColumn::NUMERIC;

/// Append the merged rows to a long-lived history CSV.
///
/// The header is written only when the file is new or empty. Returns the
/// number of rows appended.
pub fn append_history(path: &Path, dataset: &LongitudinalDataset) -> Result<usize> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    let mut file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("failed to open history file {}", path.display()))?;
    let is_new = file.metadata()?.len() == 0;

    let mut wtr = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(vec![]);
    if is_new {
        let mut header = vec!["date", "symbol"];
        header.extend(HISTORY_COLUMNS.iter().map(|c| c.name()));
        wtr.write_record(&header)?;
    }
    for record in dataset {
        let mut row = vec![record.date.to_string(), record.symbol.clone()];
        row.extend(HISTORY_COLUMNS.iter().map(|&c| format_value(record.value(c))));
        wtr.write_record(&row)?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    file.write_all(&data)?;
    file.flush()?;

    tracing::info!(path = %path.display(), rows = dataset.len(), "appended history");
    Ok(dataset.len())
}

// ─── Parquet ────────────────────────────────────────────────────────

/// Write the merged dataset as Parquet with nullable numeric columns.
pub fn write_parquet(dataset: &LongitudinalDataset, path: &Path) -> Result<()> {
    let mut df = DatasetSchema::to_dataframe(dataset).context("failed to build DataFrame")?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("failed to create {}", path.display()))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Write every configured artifact for a run.
///
/// Returns the paths written, in a fixed order.
pub fn save_outputs(output: &PipelineOutput, config: &OutputConfig) -> Result<Vec<PathBuf>> {
    std::fs::create_dir_all(&config.dir)
        .with_context(|| format!("failed to create output dir: {}", config.dir.display()))?;

    let analytics = &output.analytics;
    let artifacts = [
        (
            &config.merged_file,
            export_merged_csv(&output.dataset, &analytics.returns)?,
        ),
        (&config.summary_file, export_summary_csv(&analytics.companies)?),
        (&config.aggregates_file, export_daily_csv(&analytics.daily)?),
        (
            &config.correlation_file,
            export_correlation_csv(&analytics.correlation)?,
        ),
        (
            &config.run_summary_file,
            output
                .summary
                .to_json()
                .context("failed to serialize run summary")?,
        ),
    ];

    let mut written = Vec::new();
    for (file, contents) in artifacts {
        let path = config.path(file);
        std::fs::write(&path, contents)
            .with_context(|| format!("failed to write {}", path.display()))?;
        written.push(path);
    }

    if config.parquet {
        let path = config.parquet_path();
        write_parquet(&output.dataset, &path)?;
        written.push(path);
    }

    if config.append_history {
        let path = config.path(&config.history_file);
        append_history(&path, &output.dataset)?;
        written.push(path);
    }

    tracing::info!(dir = %config.dir.display(), files = written.len(), "outputs written");
    Ok(written)
}
