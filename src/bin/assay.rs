//! assay: inventory attribute sizes of exported index documents
//!
//! Usage:
//!   # Documents as a JSON array, reports written to the current directory
//!   assay hits.json
//!
//!   # Search hits as NDJSON, bodies under `_source`, four measuring threads
//!   assay --ndjson --source-field _source --workers 4 hits.jsonl -o ./reports
//!
//!   # JSON Lines reports instead of CSV
//!   cat hits.jsonl | assay --ndjson --format jsonl

// Use MiMalloc allocator for better performance (recommended by simd-json)
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use anyhow::{Context, Result};
use assay::sink::open_report;
use assay::{
    AggregateConfig, MalformedPolicy, MeasureConfig, Measurement, ReportFormat, StatisticRecord,
    Survey, SurveyConfig,
};
use clap::{Parser, ValueEnum};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "assay")]
#[command(about = "Measure attribute sizes of JSON documents and summarize them", long_about = None)]
struct Args {
    /// Input file (use stdin if omitted)
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Process newline-delimited JSON (one document per line)
    #[arg(long)]
    ndjson: bool,

    /// Directory for attribute_sizes and attribute_size_statistics reports
    #[arg(long, short = 'o', default_value = ".")]
    output_dir: PathBuf,

    /// Report file format
    #[arg(long, value_enum, default_value_t = Format::Csv)]
    format: Format,

    /// Field holding the document identifier
    #[arg(long, default_value = "hubmap_id")]
    id_field: String,

    /// Envelope field wrapping each document body (e.g. `_source` for search hits)
    #[arg(long)]
    source_field: Option<String>,

    /// Number of measuring threads
    #[arg(long, default_value_t = 1)]
    workers: usize,

    /// What to do when a document holds an unsupported value
    #[arg(long, value_enum, default_value_t = OnMalformed::SkipDocument)]
    on_malformed: OnMalformed,

    /// Only summarize whole lists and dictionaries, not paths inside list elements
    #[arg(long)]
    skip_element_paths: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Jsonl,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum OnMalformed {
    SkipDocument,
    SkipValue,
}

impl Args {
    fn survey_config(&self) -> SurveyConfig {
        SurveyConfig {
            id_field: self.id_field.clone(),
            source_field: self.source_field.clone(),
            workers: self.workers,
            measure: MeasureConfig {
                on_malformed: match self.on_malformed {
                    OnMalformed::SkipDocument => MalformedPolicy::SkipDocument,
                    OnMalformed::SkipValue => MalformedPolicy::SkipValue,
                },
            },
            aggregate: AggregateConfig {
                skip_element_paths: self.skip_element_paths,
            },
        }
    }

    fn report_format(&self) -> ReportFormat {
        match self.format {
            Format::Csv => ReportFormat::Csv,
            Format::Jsonl => ReportFormat::JsonLines,
        }
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level);

    let reader = if let Some(path) = &args.input {
        let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
        Box::new(BufReader::new(file)) as Box<dyn Read>
    } else {
        Box::new(std::io::stdin()) as Box<dyn Read>
    };

    let values = read_documents(reader, args.ndjson)?;
    if values.is_empty() {
        eprintln!("Warning: No JSON documents found in input");
    }

    let config = args.survey_config();
    let documents = config.source_documents(values);
    let report = Survey::new(config).run(&documents);

    let format = args.report_format();

    let mut sizes = open_report::<Measurement>(&args.output_dir, format)?;
    report.store.with_rows(|rows| sizes.write_rows(rows))?;
    sizes.flush()?;

    let mut statistics = open_report::<StatisticRecord>(&args.output_dir, format)?;
    statistics.write_rows(&report.statistics)?;
    statistics.flush()?;

    info!(
        output_dir = %args.output_dir.display(),
        documents = report.documents_measured,
        paths = report.catalog.len(),
        errors = report.errors.len(),
        "reports written"
    );

    Ok(())
}

/// Logs go to stderr; RUST_LOG wins over `--log-level`
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Read documents using SIMD-accelerated parsing, falling back to NDJSON
fn read_documents(reader: Box<dyn Read>, ndjson: bool) -> Result<Vec<Value>> {
    let mut content = Vec::new();
    let mut buf_reader = BufReader::new(reader);
    buf_reader
        .read_to_end(&mut content)
        .context("Failed to read input")?;

    if ndjson {
        return parse_lines(&content);
    }

    // simd-json parses in place, so keep the untouched bytes for the fallback
    let mut scratch = content.clone();
    match simd_json::serde::from_slice::<Value>(&mut scratch) {
        // JSON array - every element is a document
        Ok(Value::Array(values)) => Ok(values),
        Ok(value) => Ok(vec![value]),
        // Not a single JSON value, most likely NDJSON
        Err(_) => parse_lines(&content),
    }
}

fn parse_lines(content: &[u8]) -> Result<Vec<Value>> {
    let content_str = String::from_utf8_lossy(content);
    let mut values = Vec::new();

    for (number, line) in content_str.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", number + 1))?;
        values.push(value);
    }

    Ok(values)
}
