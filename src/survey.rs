//! One batch run over a corpus: catalog, measure, aggregate
//!
//! Measuring may be spread over scoped worker threads. Every worker appends to
//! the same `MeasurementStore`; the end of the scope is the barrier after
//! which statistics are computed.

use crate::document::{DocumentId, SourceDocument};
use crate::error::MeasureError;
use crate::measure::{MeasureConfig, MeasurementStore, PathCatalog, StructuralMeasurer};
use crate::path::AttributePath;
use crate::stats::{AggregateConfig, StatisticRecord, StatisticsAggregator};
use serde_json::Value;
use std::thread;
use tracing::{debug, info, warn};

/// Configuration for a corpus run
#[derive(Debug, Clone)]
pub struct SurveyConfig {
    /// Field holding each document's identifier
    pub id_field: String,

    /// Envelope field wrapping the document body, e.g. `_source` for search hits
    pub source_field: Option<String>,

    /// Number of measuring threads (1 = measure on the calling thread)
    pub workers: usize,

    pub measure: MeasureConfig,
    pub aggregate: AggregateConfig,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        SurveyConfig {
            id_field: String::from("hubmap_id"),
            source_field: None,
            workers: 1,
            measure: MeasureConfig::default(),
            aggregate: AggregateConfig::default(),
        }
    }
}

impl SurveyConfig {
    /// Turn raw JSON records into identified documents.
    ///
    /// The id is read from the body first, then from the envelope; records
    /// carrying neither get a generated id.
    pub fn source_documents(&self, values: Vec<Value>) -> Vec<SourceDocument> {
        let mut counter = 0;

        values
            .into_iter()
            .map(|value| {
                let (body, envelope) = self.unwrap_source(value);
                let id = DocumentId::from_field(&body, &self.id_field)
                    .or_else(|| {
                        envelope
                            .as_ref()
                            .and_then(|e| DocumentId::from_field(e, &self.id_field))
                    })
                    .unwrap_or_else(|| DocumentId::generated(&mut counter));
                SourceDocument::new(id, body)
            })
            .collect()
    }

    fn unwrap_source(&self, value: Value) -> (Value, Option<Value>) {
        let Some(field) = &self.source_field else {
            return (value, None);
        };

        match value {
            Value::Object(mut envelope) => match envelope.remove(field) {
                Some(body) => (body, Some(Value::Object(envelope))),
                None => (Value::Object(envelope), None),
            },
            other => (other, None),
        }
    }
}

/// A failure confined to one document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentError {
    pub document_id: DocumentId,
    pub path: AttributePath,
    pub message: String,
}

impl From<MeasureError> for DocumentError {
    fn from(error: MeasureError) -> Self {
        DocumentError {
            document_id: error.document_id().clone(),
            path: error.path().clone(),
            message: error.to_string(),
        }
    }
}

/// Side channel of per-document failures; never aborts a run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorReport {
    entries: Vec<DocumentError>,
}

impl ErrorReport {
    pub fn record(&mut self, error: impl Into<DocumentError>) {
        self.entries.push(error.into());
    }

    pub fn entries(&self) -> &[DocumentError] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a corpus run produced
#[derive(Debug)]
pub struct SurveyReport {
    pub catalog: PathCatalog,
    pub store: MeasurementStore,
    pub statistics: Vec<StatisticRecord>,
    pub errors: ErrorReport,
    /// Documents that contributed measurements
    pub documents_measured: usize,
}

/// Runs the catalog → measure → aggregate pipeline over a corpus
#[derive(Debug, Clone, Default)]
pub struct Survey {
    config: SurveyConfig,
}

impl Survey {
    pub fn new(config: SurveyConfig) -> Self {
        Survey { config }
    }

    pub fn config(&self) -> &SurveyConfig {
        &self.config
    }

    pub fn run(&self, documents: &[SourceDocument]) -> SurveyReport {
        let catalog = PathCatalog::from_documents(documents.iter().map(|d| &d.body));
        debug!(
            documents = documents.len(),
            paths = catalog.len(),
            max_depth = catalog.max_depth(),
            "path catalog built"
        );

        let store = MeasurementStore::new();
        let measurer = StructuralMeasurer::new(&catalog, self.config.measure);

        let workers = self.config.workers.clamp(1, documents.len().max(1));
        let failures = if workers == 1 {
            measure_all(&measurer, documents, &store)
        } else {
            let chunk_size = documents.len().div_ceil(workers);
            thread::scope(|scope| {
                let handles: Vec<_> = documents
                    .chunks(chunk_size)
                    .map(|chunk| {
                        let measurer = &measurer;
                        let store = &store;
                        scope.spawn(move || measure_all(measurer, chunk, store))
                    })
                    .collect();

                // Joined in chunk order so the error report follows corpus order
                let mut failures = Vec::new();
                for handle in handles {
                    match handle.join() {
                        Ok(chunk_failures) => failures.extend(chunk_failures),
                        Err(payload) => std::panic::resume_unwind(payload),
                    }
                }
                failures
            })
        };

        let mut errors = ErrorReport::default();
        let mut skipped = 0;
        for failure in failures {
            if failure.skipped {
                skipped += 1;
            }
            for error in failure.errors {
                warn!(
                    document_id = %error.document_id(),
                    path = %error.path(),
                    skipped_document = failure.skipped,
                    "{}",
                    error
                );
                errors.record(error);
            }
        }

        let statistics =
            store.with_rows(|rows| StatisticsAggregator::new(self.config.aggregate).aggregate(rows));

        let documents_measured = documents.len() - skipped;
        info!(
            documents = documents_measured,
            skipped,
            measurements = store.len(),
            statistics = statistics.len(),
            "survey complete"
        );

        SurveyReport {
            catalog,
            store,
            statistics,
            errors,
            documents_measured,
        }
    }
}

/// Malformed values found in one document
struct Failure {
    errors: Vec<MeasureError>,
    /// The document contributed no measurements
    skipped: bool,
}

fn measure_all(
    measurer: &StructuralMeasurer<'_>,
    documents: &[SourceDocument],
    store: &MeasurementStore,
) -> Vec<Failure> {
    let mut failures = Vec::new();

    for document in documents {
        let outcome = measurer.measure_outcome(document);
        if !outcome.errors.is_empty() {
            failures.push(Failure {
                skipped: outcome.measurements.is_empty(),
                errors: outcome.errors,
            });
        }
        store.append(outcome.measurements);
    }

    failures
}
