//! Per-company daily change and cumulative return.
//!
//! Each company is aligned to the dataset's full date axis before chaining:
//! a date on which the company has no row, or has no close, is a gap. A gap
//! leaves the next change undefined and restarts the compounding chain at
//! 1.0 from the next valid close. Nothing is forward-filled.

use crate::data::LongitudinalDataset;
use crate::domain::StockRecord;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Derived return figures for one (date, company) row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub symbol: String,
    pub close: Option<f64>,
    /// (close − previous close) / previous close, as a fraction.
    pub daily_change: Option<f64>,
    /// Running product of (1 + daily change) since the chain last started.
    pub cumulative_return: Option<f64>,
    /// 1-based sequence number of this row among the company's rows.
    pub day: usize,
}

/// Fractional change between two closes. Undefined when either is missing
/// or the previous close is zero.
pub fn pct_change(previous: Option<f64>, current: Option<f64>) -> Option<f64> {
    match (previous, current) {
        (Some(p), Some(c)) if p != 0.0 => Some((c - p) / p),
        _ => None,
    }
}

/// Compute return points for every row, in dataset order (date, then symbol).
pub fn compute_returns(dataset: &LongitudinalDataset) -> Vec<ReturnPoint> {
    let date_index: HashMap<NaiveDate, usize> = dataset
        .dates()
        .into_iter()
        .enumerate()
        .map(|(i, d)| (d, i))
        .collect();

    let mut by_company: BTreeMap<&str, Vec<&StockRecord>> = BTreeMap::new();
    for record in dataset {
        by_company.entry(record.symbol.as_str()).or_default().push(record);
    }

    let mut points = Vec::with_capacity(dataset.len());
    for rows in by_company.values() {
        company_returns(rows, &date_index, &mut points);
    }
    points.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
    points
}

fn company_returns(
    rows: &[&StockRecord],
    date_index: &HashMap<NaiveDate, usize>,
    out: &mut Vec<ReturnPoint>,
) {
    let mut previous: Option<(usize, Option<f64>)> = None;
    let mut chain: Option<f64> = None;

    for (k, record) in rows.iter().enumerate() {
        let Some(&at) = date_index.get(&record.date) else {
            continue;
        };

        let daily_change = match previous {
            Some((prev_at, prev_close)) if prev_at + 1 == at => pct_change(prev_close, record.close),
            _ => None,
        };

        let cumulative_return = match (record.close, chain, daily_change) {
            (None, _, _) => None,
            (Some(_), Some(level), Some(change)) => Some(level * (1.0 + change)),
            (Some(_), _, _) => Some(1.0),
        };

        out.push(ReturnPoint {
            date: record.date,
            symbol: record.symbol.clone(),
            close: record.close,
            daily_change,
            cumulative_return,
            day: k + 1,
        });

        chain = cumulative_return;
        previous = Some((at, record.close));
    }
}
