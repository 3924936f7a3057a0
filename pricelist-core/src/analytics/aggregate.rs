//! Cross-sectional and per-company aggregates.
//!
//! Sums and means only ever see present values. A group in which nothing was
//! reported yields `None`, never 0.

use crate::data::LongitudinalDataset;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Market-wide figures for one trading date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateAggregate {
    pub date: NaiveDate,
    /// Companies listed on this date.
    pub companies: usize,
    pub total_volume: Option<f64>,
    /// Companies that reported a volume.
    pub volume_reporters: usize,
    pub average_close: Option<f64>,
    /// Companies that reported a close.
    pub close_reporters: usize,
}

/// Whole-period figures for one company.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyAggregate {
    pub symbol: String,
    /// Dates on which the company appears.
    pub observations: usize,
    pub total_volume: Option<f64>,
    pub average_close: Option<f64>,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

// ─── Building blocks ────────────────────────────────────────────────

/// Sum of present values and how many there were.
pub fn sum_present(values: impl IntoIterator<Item = Option<f64>>) -> (Option<f64>, usize) {
    let (sum, n) = values
        .into_iter()
        .flatten()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        (None, 0)
    } else {
        (Some(sum), n)
    }
}

/// Mean of present values and how many there were.
pub fn mean_present(values: impl IntoIterator<Item = Option<f64>>) -> (Option<f64>, usize) {
    let (sum, n) = sum_present(values);
    (sum.map(|s| s / n as f64), n)
}

// ─── Aggregations ───────────────────────────────────────────────────

/// One aggregate per distinct date, ascending.
pub fn date_aggregates(dataset: &LongitudinalDataset) -> Vec<DateAggregate> {
    dataset
        .dates()
        .into_iter()
        .map(|date| {
            let rows = dataset.filter_date(date);
            let (total_volume, volume_reporters) = sum_present(rows.iter().map(|r| r.volume));
            let (average_close, close_reporters) = mean_present(rows.iter().map(|r| r.close));
            DateAggregate {
                date,
                companies: rows.len(),
                total_volume,
                volume_reporters,
                average_close,
                close_reporters,
            }
        })
        .collect()
}

/// One aggregate per company, ordered by symbol.
pub fn company_aggregates(dataset: &LongitudinalDataset) -> Vec<CompanyAggregate> {
    let mut grouped: BTreeMap<&str, Vec<_>> = BTreeMap::new();
    for record in dataset {
        grouped.entry(record.symbol.as_str()).or_default().push(record);
    }

    grouped
        .into_iter()
        .filter_map(|(symbol, rows)| {
            let first_date = rows.first()?.date;
            let last_date = rows.last()?.date;
            let (total_volume, _) = sum_present(rows.iter().map(|r| r.volume));
            let (average_close, _) = mean_present(rows.iter().map(|r| r.close));
            Some(CompanyAggregate {
                symbol: symbol.to_string(),
                observations: rows.len(),
                total_volume,
                average_close,
                first_date,
                last_date,
            })
        })
        .collect()
}

/// Companies with the highest total volume, most traded first.
///
/// Companies that never reported a volume are excluded. Ties break on symbol.
pub fn top_by_volume(companies: &[CompanyAggregate], n: usize) -> Vec<&CompanyAggregate> {
    let mut ranked = with_volume(companies);
    ranked.sort_by(|a, b| by_volume(b, a).then_with(|| a.symbol.cmp(&b.symbol)));
    ranked.truncate(n);
    ranked
}

/// Companies with the lowest total volume, least traded first.
pub fn bottom_by_volume(companies: &[CompanyAggregate], n: usize) -> Vec<&CompanyAggregate> {
    let mut ranked = with_volume(companies);
    ranked.sort_by(|a, b| by_volume(a, b).then_with(|| a.symbol.cmp(&b.symbol)));
    ranked.truncate(n);
    ranked
}

fn with_volume(companies: &[CompanyAggregate]) -> Vec<&CompanyAggregate> {
    companies.iter().filter(|c| c.total_volume.is_some()).collect()
}

fn by_volume(a: &CompanyAggregate, b: &CompanyAggregate) -> Ordering {
    let a = a.total_volume.unwrap_or(0.0);
    let b = b.total_volume.unwrap_or(0.0);
    a.total_cmp(&b)
}
