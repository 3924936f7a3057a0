//! Integration tests for full pipeline runs over a directory of documents.

use chrono::NaiveDate;
use pricelist_runner::{
    save_outputs, DocumentError, Pipeline, PipelineConfig, PipelineError, SilentProgress,
};
use std::path::Path;
use tempfile::TempDir;

const JAN_2: &str = "\
NIGERIAN EXCHANGE GROUP
Symbol    Open    High    Low    Close    Volume
ABC    9.50    10.20    9.40    10.00    1,000
XYZ    4.00    4.10    3.90    4.05    25,000
TOTAL    -    -    -    -    26,000
";

const JAN_3: &str = "\
Ticker    Closing Price    Volume Traded
ABC    11.00    2,500
XYZ    4.10    30,000
XYZ    9.99    1
";

const JAN_4: &str = "\
Symbol    Open    High    Low    Close    Volume
ABC    -    -    -    N/A    0
XYZ    4.10    4.30    4.10    4.25    12,000
";

fn write(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).unwrap();
}

/// Input directory with three good documents plus noise.
fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    std::fs::create_dir_all(&input).unwrap();
    write(&input, "DAILY_PRICE_LIST_January_2_2024.txt", JAN_2);
    write(&input, "DAILY_PRICE_LIST_January_3_2024.txt", JAN_3);
    write(&input, "DAILY_PRICE_LIST_January_4_2024.txt", JAN_4);
    write(&input, "README.md", "not a price list");
    dir
}

fn config(root: &Path) -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.input.dir = root.join("input");
    config.input.extension = "txt".into();
    config.output.dir = root.join("output");
    config
}

#[test]
fn run_merges_and_exports() {
    let root = fixture();
    let config = config(root.path());
    let output = Pipeline::new(config.clone()).run(&SilentProgress).unwrap();

    assert_eq!(output.summary.documents, 3);
    assert_eq!(output.summary.succeeded.len(), 3);
    assert!(output.summary.skipped.is_empty());
    assert_eq!(output.dataset.len(), 6);
    assert_eq!(output.summary.companies, 2);

    // Duplicate XYZ row on the 3rd: the first one wins.
    let jan3 = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
    let xyz = output
        .dataset
        .filter_date(jan3)
        .iter()
        .find(|r| r.symbol == "XYZ")
        .unwrap();
    assert_eq!(xyz.close, Some(4.10));
    assert_eq!(output.summary.duplicates_dropped, 1);

    // The 3rd carried no open/high/low; the superset still has them.
    let abc = &output.dataset.filter_date(jan3)[0];
    assert_eq!(abc.open, None);

    let written = save_outputs(&output, &config.output).unwrap();
    assert_eq!(written.len(), 5);
    for path in &written {
        assert!(path.exists(), "{} missing", path.display());
    }

    let merged = std::fs::read_to_string(config.output.path("output.csv")).unwrap();
    assert!(merged.starts_with(
        "date,symbol,open,high,low,close,volume,daily_change,cumulative_return,day\n"
    ));
    assert!(merged.contains("2024-01-04,ABC,NA,NA,NA,NA,0,NA,NA,3"));
    assert!(!merged.contains("TOTAL"));
}

#[test]
fn rerun_is_byte_identical() {
    let root = fixture();
    let config = config(root.path());

    let first = Pipeline::new(config.clone()).run(&SilentProgress).unwrap();
    save_outputs(&first, &config.output).unwrap();
    let merged_a = std::fs::read(config.output.path("output.csv")).unwrap();
    let summary_a = std::fs::read(config.output.path("run_summary.json")).unwrap();

    let second = Pipeline::new(config.clone()).run(&SilentProgress).unwrap();
    save_outputs(&second, &config.output).unwrap();
    let merged_b = std::fs::read(config.output.path("output.csv")).unwrap();
    let summary_b = std::fs::read(config.output.path("run_summary.json")).unwrap();

    assert_eq!(merged_a, merged_b);
    assert_eq!(summary_a, summary_b);
    assert_eq!(first.summary.fingerprint, second.summary.fingerprint);
}

#[test]
fn parallel_run_matches_sequential() {
    let root = fixture();
    let sequential = config(root.path());
    let mut parallel = sequential.clone();
    parallel.parallel = true;

    let a = Pipeline::new(sequential).run(&SilentProgress).unwrap();
    let b = Pipeline::new(parallel).run(&SilentProgress).unwrap();
    assert_eq!(a.dataset, b.dataset);
    assert_eq!(a.analytics, b.analytics);
    assert_eq!(a.summary, b.summary);
}

#[test]
fn bad_documents_are_skipped_not_fatal() {
    let root = fixture();
    let input = root.path().join("input");
    write(&input, "DAILY_PRICE_LIST_Janury_5_2024.txt", JAN_4);
    write(&input, "DAILY_PRICE_LIST_February_30_2024.txt", JAN_4);
    write(&input, "DAILY_PRICE_LIST_January_8_2024.txt", "Nothing to see here\n");

    let pipeline = Pipeline::new(config(root.path()));
    let output = pipeline.run(&SilentProgress).unwrap();

    assert_eq!(output.summary.documents, 6);
    assert_eq!(output.summary.succeeded.len(), 3);
    let skipped: Vec<&str> = output
        .summary
        .skipped
        .iter()
        .map(|s| s.file_name.as_str())
        .collect();
    assert_eq!(
        skipped,
        vec![
            "DAILY_PRICE_LIST_February_30_2024.txt",
            "DAILY_PRICE_LIST_January_8_2024.txt",
            "DAILY_PRICE_LIST_Janury_5_2024.txt",
        ]
    );
    assert_eq!(output.dataset.dates().len(), 3);
}

#[test]
fn zero_successes_is_a_run_error() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("input");
    std::fs::create_dir_all(&input).unwrap();
    write(&input, "prices_monday.txt", JAN_2);
    write(&input, "prices_tuesday.txt", JAN_3);

    let result = Pipeline::new(config(dir.path())).run(&SilentProgress);
    assert!(matches!(
        result,
        Err(PipelineError::NothingSucceeded { total: 2 })
    ));
}

#[test]
fn missing_input_dir_is_a_run_error() {
    let dir = tempfile::tempdir().unwrap();
    let result = Pipeline::new(config(dir.path())).run(&SilentProgress);
    assert!(matches!(result, Err(PipelineError::Discover { .. })));
}

#[test]
fn skipped_reason_is_typed() {
    let root = fixture();
    let pipeline = Pipeline::new(config(root.path()));
    let documents = pipeline.discover().unwrap();
    assert_eq!(documents.len(), 3);

    let bogus = pricelist_core::domain::SourceDocument::new(
        root.path().join("input").join("DAILY_PRICE_LIST_January_2_24.txt"),
    );
    assert!(matches!(
        pipeline.process(&bogus),
        Err(DocumentError::Date(_))
    ));
}

#[test]
fn history_accumulates_across_runs() {
    let root = fixture();
    let mut config = config(root.path());
    config.output.append_history = true;

    for _ in 0..2 {
        let output = Pipeline::new(config.clone()).run(&SilentProgress).unwrap();
        save_outputs(&output, &config.output).unwrap();
    }

    let history = std::fs::read_to_string(config.output.path("stock_history.csv")).unwrap();
    assert_eq!(history.lines().count(), 1 + 2 * 6);
    assert_eq!(history.matches("date,symbol").count(), 1);
}
