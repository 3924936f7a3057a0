//! Pricelist CLI: run the pipeline, check filenames, inspect documents.
//!
//! Commands:
//! - `run`: process a directory of daily price lists and write the outputs
//! - `resolve`: show the trading date each filename resolves to
//! - `inspect`: list the tables found in one document and how they normalize

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use pricelist_core::data::{
    BlockLayout, DateResolver, HeaderSource, RecordNormalizer, TableExtractor,
};
use pricelist_runner::{
    save_outputs, Pipeline, PipelineConfig, PipelineProgress, SilentProgress, StdoutProgress,
};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "pricelist",
    about = "Pricelist CLI: daily stock price-list extraction and analytics"
)]
struct Cli {
    /// Only log errors.
    #[arg(long, short, global = true, default_value_t = false)]
    quiet: bool,

    /// Log each document as it is processed.
    #[arg(long, short, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Process every document in the input directory and write the outputs.
    Run {
        /// Path to a TOML config file. Flags below override it.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Input directory.
        #[arg(long)]
        input: Option<PathBuf>,

        /// Output directory.
        #[arg(long)]
        output: Option<PathBuf>,

        /// Document extension (pdf or txt).
        #[arg(long)]
        extension: Option<String>,

        /// Process documents in parallel.
        #[arg(long, default_value_t = false)]
        parallel: bool,

        /// Also write the merged dataset as Parquet.
        #[arg(long, default_value_t = false)]
        parquet: bool,

        /// Append merged rows to the history CSV.
        #[arg(long, default_value_t = false)]
        append_history: bool,

        /// Print the run summary as JSON instead of text.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Show the trading date each filename resolves to.
    Resolve {
        /// Filenames (directory components are ignored).
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// Path to a TOML config file for the naming convention.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// List the tables found in one document and how they normalize.
    Inspect {
        /// Document to inspect.
        file: PathBuf,

        /// Path to a TOML config file.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Print every normalized record.
        #[arg(long, default_value_t = false)]
        records: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose)?;

    match cli.command {
        Commands::Run {
            config,
            input,
            output,
            extension,
            parallel,
            parquet,
            append_history,
            json,
        } => {
            let mut config = load_config(config.as_deref())?;
            if let Some(input) = input {
                config.input.dir = input;
            }
            if let Some(output) = output {
                config.output.dir = output;
            }
            if let Some(extension) = extension {
                config.input.extension = extension;
            }
            config.parallel |= parallel;
            config.output.parquet |= parquet;
            config.output.append_history |= append_history;
            run_pipeline(config, cli.quiet || json, json)
        }
        Commands::Resolve { files, config } => {
            let config = load_config(config.as_deref())?;
            run_resolve(&config.resolver(), &files)
        }
        Commands::Inspect {
            file,
            config,
            records,
        } => {
            let config = load_config(config.as_deref())?;
            run_inspect(&config, &file, records)
        }
    }
}

fn init_tracing(quiet: bool, verbose: bool) -> Result<()> {
    let level = if quiet {
        "error"
    } else if verbose {
        "info"
    } else {
        "warn"
    };

    let filter = tracing_subscriber::EnvFilter::try_from_env("PRICELIST_LOG")
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|error| anyhow::anyhow!("failed to initialize tracing subscriber: {error}"))?;

    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => {
            let config = PipelineConfig::from_file(path)
                .with_context(|| format!("failed to load config {}", path.display()))?;
            tracing::debug!(path = %path.display(), "loaded config");
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn run_pipeline(config: PipelineConfig, silent: bool, json: bool) -> Result<()> {
    let progress: &dyn PipelineProgress = if silent {
        &SilentProgress
    } else {
        &StdoutProgress
    };

    let pipeline = Pipeline::new(config);
    let output = pipeline.run(progress).context("pipeline run failed")?;
    let written = save_outputs(&output, &pipeline.config().output)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&output.summary)?);
    } else {
        println!("\n{}", output.summary);
        println!("\nOutputs:");
        for path in &written {
            println!("  {}", path.display());
        }
    }
    Ok(())
}

fn run_resolve(resolver: &DateResolver, files: &[PathBuf]) -> Result<()> {
    let mut failures = 0usize;
    for file in files {
        let name = file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        match resolver.resolve(&name) {
            Ok(date) => println!("{name}\t{}", date.format("%Y-%m-%d")),
            Err(e) => {
                eprintln!("{name}\terror: {e}");
                failures += 1;
            }
        }
    }
    if failures > 0 {
        bail!("{failures} of {} filenames did not resolve", files.len());
    }
    Ok(())
}

fn run_inspect(config: &PipelineConfig, file: &Path, show_records: bool) -> Result<()> {
    let name = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let date = match config.resolver().resolve(&name) {
        Ok(date) => Some(date),
        Err(e) => {
            println!("Date: unresolved ({e})");
            None
        }
    };
    if let Some(date) = date {
        println!("Date: {date}");
    }

    let extractor = TableExtractor::new(config.extract.clone());
    let normalizer = RecordNormalizer::new(&config.normalize);
    let mut tables = extractor
        .open(file)
        .with_context(|| format!("failed to open {}", file.display()))?;
    println!("Pages: {}", tables.page_count());

    let mut found = 0usize;
    for block in tables.by_ref() {
        found += 1;
        println!(
            "\nPage {} table {}: {} columns x {} rows",
            block.page,
            block.index_on_page + 1,
            block.width(),
            block.height()
        );
        println!("  header: {}", block.header.join(" | "));

        let Some(layout) = normalizer.layout(&block) else {
            println!("  not a price table");
            continue;
        };
        let mapped: Vec<String> = layout
            .mapping
            .columns()
            .filter_map(|c| layout.mapping.position(c).map(|i| format!("{c}@{i}")))
            .collect();
        println!("  columns: {}{}", mapped.join(", "), layout_note(&layout));

        // Records need a date; inspect still shows the layout without one.
        let Some(date) = date else { continue };
        let normalized = normalizer.normalize(&block, date);
        println!(
            "  records: {}, warnings: {}",
            normalized.records.len(),
            normalized.warnings.len()
        );
        for warning in &normalized.warnings {
            println!("    warning: {warning}");
        }
        if show_records {
            for r in &normalized.records {
                println!(
                    "    {:<14} open={:?} high={:?} low={:?} close={:?} volume={:?}",
                    r.symbol, r.open, r.high, r.low, r.close, r.volume
                );
            }
        }
    }

    for failure in tables.failed_pages() {
        println!("\nSkipped {failure}");
    }
    if found == 0 {
        println!("\nNo tables found.");
    }
    Ok(())
}

fn layout_note(layout: &BlockLayout) -> String {
    match layout.source {
        HeaderSource::Block => String::new(),
        HeaderSource::Row(index) => format!(" (header on body row {}, title above skipped)", index + 1),
        HeaderSource::Fallback if layout.header_is_data => {
            " (fallback layout, first line is data)".to_string()
        }
        HeaderSource::Fallback => " (fallback layout, header not recognized)".to_string(),
    }
}
