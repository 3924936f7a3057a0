//! Pricelist Runner: pipeline orchestration, run summaries, artifact export.
//!
//! This crate builds on `pricelist-core` to provide:
//! - TOML pipeline configuration
//! - Directory discovery and per-document processing with typed outcomes
//! - Optional parallel extraction on the rayon pool
//! - Run summary (read / skipped-and-why) and progress callbacks
//! - CSV, Parquet and JSON export

pub mod config;
pub mod export;
pub mod pipeline;
pub mod progress;
pub mod summary;

pub use config::{AnalyticsConfig, ConfigError, InputConfig, OutputConfig, PipelineConfig};
pub use export::save_outputs;
pub use pipeline::{
    discover_documents, DocumentError, DocumentOutcome, DocumentReport, Pipeline, PipelineError,
    PipelineOutput,
};
pub use progress::{PipelineProgress, SilentProgress, StdoutProgress};
pub use summary::{ReadDocument, RunSummary, SkippedDocument};

#[cfg(test)]
mod send_sync_checks {
    use super::*;

    fn assert_send<T: Send>() {}
    fn assert_sync<T: Sync>() {}

    #[test]
    fn pipeline_is_send_sync() {
        assert_send::<Pipeline>();
        assert_sync::<Pipeline>();
    }

    #[test]
    fn config_types_are_send_sync() {
        assert_send::<PipelineConfig>();
        assert_sync::<PipelineConfig>();
    }

    #[test]
    fn document_outcome_is_send() {
        assert_send::<DocumentOutcome>();
        assert_send::<DocumentError>();
    }

    #[test]
    fn run_summary_is_send_sync() {
        assert_send::<RunSummary>();
        assert_sync::<RunSummary>();
    }
}
