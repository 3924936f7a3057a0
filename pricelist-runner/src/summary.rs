//! Per-run summary: which documents were read, which were skipped and why.

use crate::pipeline::DocumentOutcome;
use chrono::NaiveDate;
use pricelist_core::analytics::AnalyticsResult;
use pricelist_core::data::{LongitudinalDataset, MergeStats};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadDocument {
    pub file_name: String,
    pub date: NaiveDate,
    pub records: usize,
    pub tables: usize,
    pub failed_pages: usize,
    pub warnings: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkippedDocument {
    pub file_name: String,
    pub reason: String,
}

/// Summary of one run, written as `run_summary.json` and printed by the CLI.
///
/// Contains no timestamps, so an unchanged input directory produces an
/// identical summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub input_dir: PathBuf,
    pub documents: usize,
    pub succeeded: Vec<ReadDocument>,
    pub skipped: Vec<SkippedDocument>,
    pub records_in: usize,
    pub duplicates_dropped: usize,
    pub warnings: usize,
    pub rows: usize,
    pub dates: usize,
    pub companies: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub most_traded: Vec<String>,
    pub least_traded: Vec<String>,
    pub volume_close_correlation: Option<f64>,
    /// BLAKE3 fingerprint of the merged dataset.
    pub fingerprint: String,
}

impl RunSummary {
    pub fn new(
        input_dir: &Path,
        outcomes: &[DocumentOutcome],
        dataset: &LongitudinalDataset,
        analytics: &AnalyticsResult,
        stats: MergeStats,
    ) -> Self {
        let mut succeeded = Vec::new();
        let mut skipped = Vec::new();
        for outcome in outcomes {
            match &outcome.result {
                Ok(report) => succeeded.push(ReadDocument {
                    file_name: report.file_name.clone(),
                    date: report.date,
                    records: report.records.len(),
                    tables: report.tables_used,
                    failed_pages: report.failed_pages,
                    warnings: report.warnings.len(),
                }),
                Err(error) => skipped.push(SkippedDocument {
                    file_name: outcome.document.file_name.clone(),
                    reason: error.to_string(),
                }),
            }
        }

        let dates = dataset.dates();
        Self {
            input_dir: input_dir.to_path_buf(),
            documents: outcomes.len(),
            warnings: succeeded.iter().map(|d| d.warnings).sum(),
            succeeded,
            skipped,
            records_in: stats.records_in,
            duplicates_dropped: stats.duplicates_dropped,
            rows: dataset.len(),
            dates: dates.len(),
            companies: dataset.companies().len(),
            first_date: dates.first().copied(),
            last_date: dates.last().copied(),
            most_traded: analytics.most_traded.clone(),
            least_traded: analytics.least_traded.clone(),
            volume_close_correlation: analytics.volume_close_correlation,
            fingerprint: dataset.fingerprint(),
        }
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Documents: {} found, {} read, {} skipped",
            self.documents,
            self.succeeded.len(),
            self.skipped.len()
        )?;
        for skipped in &self.skipped {
            writeln!(f, "  skipped {}: {}", skipped.file_name, skipped.reason)?;
        }
        writeln!(
            f,
            "Records: {} in, {} duplicates dropped, {} normalization warnings",
            self.records_in, self.duplicates_dropped, self.warnings
        )?;
        match (self.first_date, self.last_date) {
            (Some(first), Some(last)) => writeln!(
                f,
                "Dataset: {} rows, {} companies, {} dates ({first} to {last})",
                self.rows, self.companies, self.dates
            )?,
            _ => writeln!(f, "Dataset: empty")?,
        }
        if !self.most_traded.is_empty() {
            writeln!(f, "Most traded: {}", self.most_traded.join(", "))?;
            writeln!(f, "Least traded: {}", self.least_traded.join(", "))?;
        }
        match self.volume_close_correlation {
            Some(r) => writeln!(f, "Volume/close correlation: {r:.4}")?,
            None => writeln!(f, "Volume/close correlation: n/a")?,
        }
        write!(f, "Fingerprint: {}", self.fingerprint)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{DocumentError, DocumentReport};
    use pricelist_core::analytics::AnalyticsEngine;
    use pricelist_core::data::{merge, DateParseError};
    use pricelist_core::domain::{SourceDocument, StockRecord};
    use std::collections::BTreeSet;

    fn sample() -> RunSummary {
        let date = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        let records = vec![StockRecord {
            close: Some(10.0),
            volume: Some(100.0),
            ..StockRecord::empty(date, "ABC")
        }];
        let outcomes = vec![
            DocumentOutcome {
                document: SourceDocument::new("in/DAILY_PRICE_LIST_January_2_2024.pdf").with_date(date),
                result: Ok(DocumentReport {
                    file_name: "DAILY_PRICE_LIST_January_2_2024.pdf".into(),
                    date,
                    records: records.clone(),
                    columns: BTreeSet::new(),
                    tables_found: 2,
                    tables_used: 1,
                    failed_pages: 0,
                    warnings: Vec::new(),
                }),
            },
            DocumentOutcome {
                document: SourceDocument::new("in/notes.pdf"),
                result: Err(DocumentError::Date(DateParseError::MissingPrefix {
                    file_name: "notes.pdf".into(),
                    prefix: "DAILY_PRICE_LIST_".into(),
                })),
            },
        ];
        let dataset = merge(vec![records]);
        let analytics = AnalyticsEngine::default().compute(&dataset);
        let stats = MergeStats {
            records_in: 1,
            duplicates_dropped: 0,
        };
        RunSummary::new(Path::new("in"), &outcomes, &dataset, &analytics, stats)
    }

    #[test]
    fn lists_read_and_skipped_documents() {
        let summary = sample();
        assert_eq!(summary.documents, 2);
        assert_eq!(summary.succeeded.len(), 1);
        assert_eq!(summary.succeeded[0].tables, 1);
        assert_eq!(summary.skipped.len(), 1);
        assert_eq!(summary.skipped[0].file_name, "notes.pdf");
        assert!(summary.skipped[0].reason.contains("DAILY_PRICE_LIST_"));
        assert_eq!(summary.rows, 1);
        assert_eq!(summary.first_date, summary.last_date);
    }

    #[test]
    fn display_mentions_skips() {
        let text = sample().to_string();
        assert!(text.contains("2 found, 1 read, 1 skipped"));
        assert!(text.contains("skipped notes.pdf"));
        assert!(text.contains("Volume/close correlation: n/a"));
    }

    #[test]
    fn json_roundtrip() {
        let summary = sample();
        let json = summary.to_json().unwrap();
        let back: RunSummary = serde_json::from_str(&json).unwrap();
        assert_eq!(back, summary);
    }
}
