//! Pipeline orchestration: directory → per-document outcomes → dataset → analytics.
//!
//! Documents are independent. One that cannot be dated or opened is skipped
//! with a typed reason and the rest of the batch carries on. The run only
//! fails when nothing could be read, or when the merged dataset breaks its
//! own invariants.

use crate::config::PipelineConfig;
use crate::progress::PipelineProgress;
use crate::summary::RunSummary;
use chrono::NaiveDate;
use pricelist_core::analytics::{AnalyticsEngine, AnalyticsResult};
use pricelist_core::data::{
    DatasetMerger, DateParseError, DateResolver, ExtractionError, LongitudinalDataset, MergeError,
    NormalizationWarning, RecordNormalizer, TableExtractor,
};
use pricelist_core::domain::{CanonicalColumn, SourceDocument, StockRecord};
use rayon::prelude::*;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a single document was skipped.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error(transparent)]
    Date(#[from] DateParseError),

    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error("no price table among {tables_found} table(s) found")]
    NoPriceTable { tables_found: usize },
}

/// Run-level failure.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("cannot list input directory {dir}: {source}")]
    Discover {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no *.{extension} documents in {dir}")]
    NoDocuments { dir: PathBuf, extension: String },

    #[error("none of the {total} documents could be read")]
    NothingSucceeded { total: usize },

    #[error("merged dataset is inconsistent: {0}")]
    Invariant(#[from] MergeError),
}

/// What one successfully read document contributed.
#[derive(Debug, Clone)]
pub struct DocumentReport {
    pub file_name: String,
    pub date: NaiveDate,
    pub records: Vec<StockRecord>,
    /// Numeric columns carried by the document's price tables.
    pub columns: BTreeSet<CanonicalColumn>,
    pub tables_found: usize,
    pub tables_used: usize,
    pub failed_pages: usize,
    pub warnings: Vec<NormalizationWarning>,
}

/// Result of processing one document, in discovery order.
#[derive(Debug)]
pub struct DocumentOutcome {
    pub document: SourceDocument,
    pub result: Result<DocumentReport, DocumentError>,
}

/// Everything a successful run produces.
#[derive(Debug)]
pub struct PipelineOutput {
    pub dataset: LongitudinalDataset,
    pub analytics: AnalyticsResult,
    pub summary: RunSummary,
}

/// List the documents in `dir` with the given extension, ordered by filename.
///
/// Subdirectories and files with other extensions are ignored.
pub fn discover_documents(dir: &Path, extension: &str) -> std::io::Result<Vec<SourceDocument>> {
    let extension = extension.trim_start_matches('.');
    let mut documents = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(extension));
        if matches {
            documents.push(SourceDocument::new(path));
        } else {
            tracing::debug!(path = %path.display(), "ignoring file with other extension");
        }
    }
    documents.sort_by(|a, b| a.file_name.cmp(&b.file_name));
    Ok(documents)
}

/// The configured five-stage pipeline.
pub struct Pipeline {
    config: PipelineConfig,
    resolver: DateResolver,
    extractor: TableExtractor,
    normalizer: RecordNormalizer,
    engine: AnalyticsEngine,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            resolver: config.resolver(),
            extractor: TableExtractor::new(config.extract.clone()),
            normalizer: RecordNormalizer::new(&config.normalize),
            engine: AnalyticsEngine::new(config.analytics.ranking_size),
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn discover(&self) -> Result<Vec<SourceDocument>, PipelineError> {
        let dir = &self.config.input.dir;
        let documents = discover_documents(dir, &self.config.input.extension).map_err(|source| {
            PipelineError::Discover {
                dir: dir.clone(),
                source,
            }
        })?;
        if documents.is_empty() {
            return Err(PipelineError::NoDocuments {
                dir: dir.clone(),
                extension: self.resolver.extension.clone(),
            });
        }
        Ok(documents)
    }

    /// Date, extract and normalize one document. The document handle is
    /// released before this returns.
    pub fn process(&self, document: &SourceDocument) -> Result<DocumentReport, DocumentError> {
        let date = self.resolver.resolve(&document.file_name)?;
        let mut tables = self.extractor.open(document.path())?;

        let mut report = DocumentReport {
            file_name: document.file_name.clone(),
            date,
            records: Vec::new(),
            columns: BTreeSet::new(),
            tables_found: 0,
            tables_used: 0,
            failed_pages: 0,
            warnings: Vec::new(),
        };

        for block in tables.by_ref() {
            report.tables_found += 1;
            if !self.normalizer.matches(&block) {
                tracing::debug!(
                    file = %document.file_name,
                    page = block.page,
                    header = ?block.header,
                    "table is not a price list"
                );
                continue;
            }
            report.tables_used += 1;
            let normalized = self.normalizer.normalize(&block, date);
            report.records.extend(normalized.records);
            report.columns.extend(normalized.columns);
            report.warnings.extend(normalized.warnings);
        }
        report.failed_pages = tables.failed_pages().len();

        if report.tables_used == 0 {
            return Err(DocumentError::NoPriceTable {
                tables_found: report.tables_found,
            });
        }

        if !report.warnings.is_empty() {
            tracing::warn!(
                file = %document.file_name,
                warnings = report.warnings.len(),
                "normalization warnings"
            );
            for warning in &report.warnings {
                tracing::debug!(file = %document.file_name, %warning);
            }
        }
        tracing::info!(
            file = %document.file_name,
            %date,
            records = report.records.len(),
            tables = report.tables_used,
            "document processed"
        );
        Ok(report)
    }

    /// Process every document, merge, validate and analyze.
    pub fn run(&self, progress: &dyn PipelineProgress) -> Result<PipelineOutput, PipelineError> {
        let documents = self.discover()?;
        let total = documents.len();
        tracing::info!(dir = %self.config.input.dir.display(), documents = total, "starting run");

        let work = |(index, document): (usize, &SourceDocument)| {
            progress.on_start(&document.file_name, index, total);
            let result = self.process(document);
            if let Err(error) = &result {
                tracing::warn!(file = %document.file_name, %error, "skipping document");
            }
            progress.on_complete(&document.file_name, index, total, &result);
            let document = match &result {
                Ok(report) => document.clone().with_date(report.date),
                Err(_) => document.clone(),
            };
            DocumentOutcome { document, result }
        };

        let outcomes: Vec<DocumentOutcome> = if self.config.parallel {
            documents.par_iter().enumerate().map(work).collect()
        } else {
            documents.iter().enumerate().map(work).collect()
        };

        let succeeded = outcomes.iter().filter(|o| o.result.is_ok()).count();
        progress.on_batch_complete(succeeded, total - succeeded, total);
        if succeeded == 0 {
            return Err(PipelineError::NothingSucceeded { total });
        }

        // First occurrence wins, in (trading date, filename) order.
        let mut reports: Vec<&DocumentReport> = outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .collect();
        reports.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.file_name.cmp(&b.file_name)));

        let mut merger = DatasetMerger::new();
        for report in &reports {
            merger.push(report.records.iter().cloned(), &report.columns);
        }
        let (dataset, stats) = merger.finish();
        dataset.validate()?;

        if stats.duplicates_dropped > 0 {
            tracing::warn!(dropped = stats.duplicates_dropped, "duplicate (date, company) rows dropped");
        }

        let analytics = self.engine.compute(&dataset);
        let summary = RunSummary::new(&self.config.input.dir, &outcomes, &dataset, &analytics, stats);
        tracing::info!(
            rows = dataset.len(),
            dates = summary.dates,
            companies = summary.companies,
            "run complete"
        );

        Ok(PipelineOutput {
            dataset,
            analytics,
            summary,
        })
    }
}
