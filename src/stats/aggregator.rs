use crate::measure::{Measurement, StructuralType};
use crate::path::AttributePath;
use crate::sink::Tabular;
use crate::stats::summary::SizeSummary;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Corpus-wide size statistics for one attribute path
///
/// Field order is the column order of the statistics report. Numeric fields
/// are empty when no container-typed sample exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticRecord {
    pub attribute_path: AttributePath,
    pub structural_type: StructuralType,
    pub sample_count: usize,
    pub mean: Option<f64>,
    pub stddev: Option<f64>,
    pub min: Option<u64>,
    pub max: Option<u64>,
    pub p25: Option<f64>,
    pub p50: Option<f64>,
    pub p75: Option<f64>,
    pub total_bytes: Option<u64>,
    pub max_field_count: Option<u64>,
}

impl StatisticRecord {
    /// Record for a path with nothing to summarize
    pub fn empty(attribute_path: AttributePath, structural_type: StructuralType) -> Self {
        StatisticRecord {
            attribute_path,
            structural_type,
            sample_count: 0,
            mean: None,
            stddev: None,
            min: None,
            max: None,
            p25: None,
            p50: None,
            p75: None,
            total_bytes: None,
            max_field_count: None,
        }
    }
}

impl Tabular for StatisticRecord {
    const REPORT_NAME: &'static str = "attribute_size_statistics";
    const COLUMNS: &'static [&'static str] = &[
        "attribute_path",
        "structural_type",
        "sample_count",
        "mean",
        "stddev",
        "min",
        "max",
        "p25",
        "p50",
        "p75",
        "total_bytes",
        "max_field_count",
    ];
}

/// Configuration for the aggregation pass
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateConfig {
    /// Leave out paths below a sequence element (`b[0]`, `b[3].x`), keeping
    /// only whole lists and dictionaries
    pub skip_element_paths: bool,
}

/// Container rows seen for one path
#[derive(Debug, Default)]
struct PathSample {
    sequences: usize,
    mappings: usize,
    sizes: Vec<u64>,
    max_field_count: u64,
}

impl PathSample {
    fn add(&mut self, row: &Measurement) {
        match row.structural_type {
            StructuralType::Sequence => self.sequences += 1,
            StructuralType::Mapping => self.mappings += 1,
            StructuralType::Scalar | StructuralType::Absent => return,
        }
        self.sizes.push(row.size_bytes);
        self.max_field_count = self.max_field_count.max(row.field_count);
    }

    /// Prevailing container type; ties go to mapping
    fn structural_type(&self) -> StructuralType {
        if self.sequences > self.mappings {
            StructuralType::Sequence
        } else {
            StructuralType::Mapping
        }
    }

    fn into_record(self, attribute_path: AttributePath) -> StatisticRecord {
        let structural_type = self.structural_type();
        let Some(summary) = SizeSummary::from_sizes(&self.sizes) else {
            return StatisticRecord::empty(attribute_path, structural_type);
        };

        StatisticRecord {
            attribute_path,
            structural_type,
            sample_count: summary.count,
            mean: Some(summary.mean),
            stddev: Some(summary.stddev),
            min: Some(summary.min),
            max: Some(summary.max),
            p25: Some(summary.p25),
            p50: Some(summary.p50),
            p75: Some(summary.p75),
            total_bytes: Some(summary.total),
            max_field_count: Some(self.max_field_count),
        }
    }
}

/// Summarizes the sizes of list- and dictionary-valued paths across a corpus
#[derive(Debug, Clone, Copy, Default)]
pub struct StatisticsAggregator {
    config: AggregateConfig,
}

impl StatisticsAggregator {
    pub fn new(config: AggregateConfig) -> Self {
        StatisticsAggregator { config }
    }

    /// One record per path that was a sequence or mapping in at least one
    /// document, ordered by path. Scalar and absent rows never enter a sample.
    pub fn aggregate(&self, rows: &[Measurement]) -> Vec<StatisticRecord> {
        let mut groups: BTreeMap<&AttributePath, PathSample> = BTreeMap::new();

        for row in rows {
            if self.config.skip_element_paths && row.attribute_path.is_within_sequence() {
                continue;
            }
            groups.entry(&row.attribute_path).or_default().add(row);
        }

        groups
            .into_iter()
            .filter(|(_, sample)| sample.sequences + sample.mappings > 0)
            .map(|(path, sample)| sample.into_record(path.clone()))
            .collect()
    }
}
