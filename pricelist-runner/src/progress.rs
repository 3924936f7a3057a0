//! Progress callbacks for a pipeline run.

use crate::pipeline::{DocumentError, DocumentReport};

/// Progress callback for multi-document runs.
///
/// Called from rayon workers when the run is parallel, hence `Sync`.
pub trait PipelineProgress: Send + Sync {
    /// Called when a document is about to be processed.
    fn on_start(&self, file_name: &str, index: usize, total: usize);

    /// Called when a document has been processed or skipped.
    fn on_complete(
        &self,
        file_name: &str,
        index: usize,
        total: usize,
        result: &Result<DocumentReport, DocumentError>,
    );

    /// Called once every document has been visited.
    fn on_batch_complete(&self, succeeded: usize, skipped: usize, total: usize);
}

/// Simple progress reporter that prints to stdout.
pub struct StdoutProgress;

impl PipelineProgress for StdoutProgress {
    fn on_start(&self, file_name: &str, index: usize, total: usize) {
        println!("[{}/{}] Reading {file_name}...", index + 1, total);
    }

    fn on_complete(
        &self,
        file_name: &str,
        _index: usize,
        _total: usize,
        result: &Result<DocumentReport, DocumentError>,
    ) {
        match result {
            Ok(report) if report.warnings.is_empty() => {
                println!("  OK: {file_name} ({} records)", report.records.len())
            }
            Ok(report) => println!(
                "  OK: {file_name} ({} records, {} warnings)",
                report.records.len(),
                report.warnings.len()
            ),
            Err(e) => println!("  SKIP: {file_name}: {e}"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, skipped: usize, total: usize) {
        println!("\nExtraction complete: {succeeded}/{total} succeeded, {skipped} skipped");
    }
}

/// Reporter that says nothing. Tracing still records each document.
pub struct SilentProgress;

impl PipelineProgress for SilentProgress {
    fn on_start(&self, _file_name: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _file_name: &str,
        _index: usize,
        _total: usize,
        _result: &Result<DocumentReport, DocumentError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _skipped: usize, _total: usize) {}
}
