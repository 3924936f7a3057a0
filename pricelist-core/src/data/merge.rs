//! Per-date records → one longitudinal dataset.
//!
//! Merge policy:
//! - (date, symbol) is unique; the first occurrence in merge order wins and
//!   later duplicates are counted and discarded.
//! - The column set is the union of what every contributing layout carried.
//! - Output is sorted by date, then symbol.

use crate::domain::{CanonicalColumn, StockRecord};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use thiserror::Error;

/// The merged dataset violates one of its own invariants. Always a logic bug.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("duplicate row for ({date}, {symbol}) in merged dataset")]
    DuplicateKey { date: NaiveDate, symbol: String },

    #[error("merged dataset out of order at ({date}, {symbol})")]
    OutOfOrder { date: NaiveDate, symbol: String },

    #[error("row for {date} has an empty company identifier")]
    EmptySymbol { date: NaiveDate },
}

/// Counters reported after a merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MergeStats {
    pub records_in: usize,
    pub duplicates_dropped: usize,
}

/// Incremental merger. Feed contributions in a deterministic order.
#[derive(Debug, Default)]
pub struct DatasetMerger {
    seen: HashSet<(NaiveDate, String)>,
    records: Vec<StockRecord>,
    columns: BTreeSet<CanonicalColumn>,
    stats: MergeStats,
}

impl DatasetMerger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one document's records along with the numeric columns its layout carried.
    pub fn push<I>(&mut self, records: I, columns: &BTreeSet<CanonicalColumn>)
    where
        I: IntoIterator<Item = StockRecord>,
    {
        self.columns.extend(columns.iter().copied().filter(|c| c.is_numeric()));
        for record in records {
            self.stats.records_in += 1;
            for column in CanonicalColumn::NUMERIC {
                if record.value(column).is_some() {
                    self.columns.insert(column);
                }
            }
            if self.seen.insert((record.date, record.symbol.clone())) {
                self.records.push(record);
            } else {
                tracing::debug!(date = %record.date, symbol = %record.symbol, "dropping duplicate row");
                self.stats.duplicates_dropped += 1;
            }
        }
    }

    /// Sort and seal the dataset.
    pub fn finish(self) -> (LongitudinalDataset, MergeStats) {
        let mut records = self.records;
        records.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.symbol.cmp(&b.symbol)));
        let mut columns = self.columns;
        columns.extend(CanonicalColumn::REQUIRED.iter().copied().filter(|c| c.is_numeric()));
        (LongitudinalDataset { records, columns }, self.stats)
    }
}

/// Merge a batch of record sets in order. Column sets are inferred from values.
pub fn merge<I>(contributions: I) -> LongitudinalDataset
where
    I: IntoIterator<Item = Vec<StockRecord>>,
{
    let mut merger = DatasetMerger::new();
    for records in contributions {
        merger.push(records, &BTreeSet::new());
    }
    merger.finish().0
}

/// The merged (date × company) table.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LongitudinalDataset {
    records: Vec<StockRecord>,
    /// Numeric columns present in at least one source layout.
    columns: BTreeSet<CanonicalColumn>,
}

impl LongitudinalDataset {
    /// Build from already merged rows, checking every invariant.
    pub fn from_records(
        records: Vec<StockRecord>,
        columns: BTreeSet<CanonicalColumn>,
    ) -> Result<Self, MergeError> {
        let dataset = Self { records, columns };
        dataset.validate()?;
        Ok(dataset)
    }

    /// Re-check ordering and (date, symbol) uniqueness.
    pub fn validate(&self) -> Result<(), MergeError> {
        for record in &self.records {
            if record.symbol.is_empty() {
                return Err(MergeError::EmptySymbol { date: record.date });
            }
        }
        for pair in self.records.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            match prev.key().cmp(&next.key()) {
                std::cmp::Ordering::Less => {}
                std::cmp::Ordering::Equal => {
                    return Err(MergeError::DuplicateKey {
                        date: next.date,
                        symbol: next.symbol.clone(),
                    })
                }
                std::cmp::Ordering::Greater => {
                    return Err(MergeError::OutOfOrder {
                        date: next.date,
                        symbol: next.symbol.clone(),
                    })
                }
            }
        }
        Ok(())
    }

    pub fn records(&self) -> &[StockRecord] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, StockRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Numeric columns in canonical order.
    pub fn columns(&self) -> impl Iterator<Item = CanonicalColumn> + '_ {
        self.columns.iter().copied()
    }

    pub fn has_column(&self, column: CanonicalColumn) -> bool {
        column == CanonicalColumn::Symbol || self.columns.contains(&column)
    }

    /// Distinct trading dates, ascending.
    pub fn dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.records.iter().map(|r| r.date).collect();
        dates.dedup();
        dates
    }

    /// Distinct company identifiers, ascending.
    pub fn companies(&self) -> Vec<&str> {
        self.records
            .iter()
            .map(|r| r.symbol.as_str())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    /// Rows for one trading date, ordered by symbol.
    pub fn filter_date(&self, date: NaiveDate) -> &[StockRecord] {
        let start = self.records.partition_point(|r| r.date < date);
        let end = self.records.partition_point(|r| r.date <= date);
        &self.records[start..end]
    }

    /// One company's rows, ordered by date.
    pub fn series<'a>(&'a self, symbol: &'a str) -> impl Iterator<Item = &'a StockRecord> + 'a {
        self.records.iter().filter(move |r| r.symbol == symbol)
    }

    /// Deterministic BLAKE3 hash over every row and the column set.
    pub fn fingerprint(&self) -> String {
        let mut hasher = blake3::Hasher::new();
        for column in &self.columns {
            hasher.update(column.name().as_bytes());
        }
        for record in &self.records {
            hasher.update(record.date.to_string().as_bytes());
            hasher.update(record.symbol.as_bytes());
            hasher.update(&[0]);
            for column in CanonicalColumn::NUMERIC {
                match record.value(column) {
                    Some(v) => {
                        hasher.update(&[1]);
                        hasher.update(&v.to_le_bytes());
                    }
                    None => {
                        hasher.update(&[0]);
                    }
                }
            }
        }
        hasher.finalize().to_hex().to_string()
    }
}

impl<'a> IntoIterator for &'a LongitudinalDataset {
    type Item = &'a StockRecord;
    type IntoIter = std::slice::Iter<'a, StockRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ymd(m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, d).unwrap()
    }

    fn rec(date: NaiveDate, symbol: &str, close: Option<f64>) -> StockRecord {
        StockRecord {
            close,
            volume: Some(100.0),
            ..StockRecord::empty(date, symbol)
        }
    }

    #[test]
    fn merge_sorts_by_date_then_symbol() {
        let dataset = merge(vec![
            vec![rec(ymd(1, 3), "XYZ", Some(1.0)), rec(ymd(1, 3), "ABC", Some(2.0))],
            vec![rec(ymd(1, 2), "MTN", Some(3.0))],
        ]);
        let keys: Vec<_> = dataset.iter().map(|r| (r.date, r.symbol.clone())).collect();
        assert_eq!(
            keys,
            vec![
                (ymd(1, 2), "MTN".to_string()),
                (ymd(1, 3), "ABC".to_string()),
                (ymd(1, 3), "XYZ".to_string()),
            ]
        );
        assert!(dataset.validate().is_ok());
    }

    #[test]
    fn first_duplicate_wins() {
        let mut merger = DatasetMerger::new();
        merger.push(
            vec![rec(ymd(1, 2), "ABC", Some(10.0)), rec(ymd(1, 2), "ABC", Some(99.0))],
            &BTreeSet::new(),
        );
        let (dataset, stats) = merger.finish();
        assert_eq!(dataset.len(), 1);
        assert_eq!(dataset.records()[0].close, Some(10.0));
        assert_eq!(
            stats,
            MergeStats {
                records_in: 2,
                duplicates_dropped: 1
            }
        );
    }

    #[test]
    fn column_superset_is_union_of_layouts() {
        let mut merger = DatasetMerger::new();
        merger.push(
            vec![rec(ymd(1, 2), "ABC", Some(1.0))],
            &[CanonicalColumn::Close, CanonicalColumn::Volume].into_iter().collect(),
        );
        let with_open = StockRecord {
            open: Some(0.9),
            ..rec(ymd(1, 3), "ABC", Some(1.1))
        };
        merger.push(
            vec![with_open],
            &[CanonicalColumn::Open, CanonicalColumn::Close].into_iter().collect(),
        );
        let (dataset, _) = merger.finish();
        let columns: Vec<_> = dataset.columns().collect();
        assert_eq!(
            columns,
            vec![CanonicalColumn::Open, CanonicalColumn::Close, CanonicalColumn::Volume]
        );
        assert!(!dataset.has_column(CanonicalColumn::High));
        // The date without an open column carries "no value" for it.
        assert_eq!(dataset.filter_date(ymd(1, 2))[0].open, None);
    }

    #[test]
    fn required_columns_always_present() {
        let (dataset, _) = DatasetMerger::new().finish();
        assert!(dataset.is_empty());
        assert!(dataset.has_column(CanonicalColumn::Close));
        assert!(dataset.has_column(CanonicalColumn::Volume));
    }

    #[test]
    fn filter_date_and_series() {
        let dataset = merge(vec![
            vec![rec(ymd(1, 2), "ABC", Some(1.0)), rec(ymd(1, 2), "XYZ", Some(2.0))],
            vec![rec(ymd(1, 3), "ABC", Some(1.5))],
        ]);
        assert_eq!(dataset.filter_date(ymd(1, 2)).len(), 2);
        assert_eq!(dataset.filter_date(ymd(1, 3)).len(), 1);
        assert!(dataset.filter_date(ymd(1, 4)).is_empty());
        assert_eq!(dataset.series("ABC").count(), 2);
        assert_eq!(dataset.dates(), vec![ymd(1, 2), ymd(1, 3)]);
        assert_eq!(dataset.companies(), vec!["ABC", "XYZ"]);
    }

    #[test]
    fn validate_rejects_duplicates_and_disorder() {
        let columns: BTreeSet<_> = [CanonicalColumn::Close].into_iter().collect();
        let dup = LongitudinalDataset::from_records(
            vec![rec(ymd(1, 2), "ABC", None), rec(ymd(1, 2), "ABC", None)],
            columns.clone(),
        );
        assert!(matches!(dup, Err(MergeError::DuplicateKey { .. })));

        let unordered = LongitudinalDataset::from_records(
            vec![rec(ymd(1, 3), "ABC", None), rec(ymd(1, 2), "ABC", None)],
            columns,
        );
        assert!(matches!(unordered, Err(MergeError::OutOfOrder { .. })));
    }

    #[test]
    fn fingerprint_is_deterministic_and_sensitive() {
        let a = merge(vec![vec![rec(ymd(1, 2), "ABC", Some(1.0))]]);
        let b = merge(vec![vec![rec(ymd(1, 2), "ABC", Some(1.0))]]);
        let c = merge(vec![vec![rec(ymd(1, 2), "ABC", None)]]);
        assert_eq!(a.fingerprint(), b.fingerprint());
        assert_ne!(a.fingerprint(), c.fingerprint());
    }
}
