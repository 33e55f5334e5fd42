//! # Assay - Document Footprint Inventory
//!
//! Measures the schema and storage footprint of JSON documents exported from a
//! document index: for every attribute path it records structural type, depth,
//! serialized size and field count, then summarizes the sizes of list- and
//! dictionary-valued paths across the corpus.
//!
//! ## Modules
//!
//! - **measure**: path catalog, recursive measurer and measurement store
//! - **stats**: per-path descriptive statistics
//! - **sink**: CSV and JSON Lines writers for both reports
//! - **survey**: a whole corpus run with error reporting
//!
//! ## Quick Start
//!
//! ```rust
//! use assay::{Survey, SurveyConfig};
//! use serde_json::json;
//!
//! let config = SurveyConfig::default();
//! let documents = config.source_documents(vec![
//!     json!({"hubmap_id": "HBM1", "a": 1, "b": [1, 2, 3], "c": {"x": "hello"}}),
//!     json!({"hubmap_id": "HBM2", "b": []}),
//! ]);
//!
//! let report = Survey::new(config).run(&documents);
//!
//! // one row per (document, catalogued path), absent paths included
//! assert_eq!(report.store.len(), 2 * report.catalog.len());
//!
//! let b = report.statistics.iter().find(|r| r.attribute_path.to_string() == "b").unwrap();
//! assert_eq!(b.sample_count, 2);
//! ```

use anyhow::{Context, Result};
use serde_json::Value;
use std::io::BufRead;

pub mod document;
pub mod error;
pub mod measure;
pub mod path;
pub mod sink;
pub mod stats;
pub mod survey;

// Re-export commonly used types for convenience
pub use document::{Document, DocumentId, Scalar, SourceDocument};
pub use error::{MeasureError, PathParseError};
pub use measure::{
    MalformedPolicy, MeasureConfig, MeasureOutcome, Measurement, MeasurementStore, PathCatalog,
    StructuralMeasurer, StructuralType,
};
pub use path::{AttributePath, Segment};
pub use sink::{CsvSink, JsonLinesSink, ReportFormat, RowSink, Tabular};
pub use stats::{AggregateConfig, StatisticRecord, StatisticsAggregator};
pub use survey::{DocumentError, ErrorReport, Survey, SurveyConfig, SurveyReport};

/// Main entry point: survey a newline-delimited JSON stream of documents
pub fn survey_ndjson<R: BufRead>(reader: R, config: SurveyConfig) -> Result<SurveyReport> {
    let mut values = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line.context("Failed to read line")?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let value: Value = serde_json::from_str(line)
            .with_context(|| format!("Failed to parse JSON on line {}", number + 1))?;
        values.push(value);
    }

    let documents = config.source_documents(values);
    Ok(Survey::new(config).run(&documents))
}
