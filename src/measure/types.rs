use crate::document::DocumentId;
use crate::path::AttributePath;
use crate::sink::Tabular;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Shape of the value found at a path in one document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StructuralType {
    Scalar,
    Sequence,
    Mapping,
    /// The path does not exist in this document
    Absent,
}

impl StructuralType {
    pub fn is_container(self) -> bool {
        matches!(self, StructuralType::Sequence | StructuralType::Mapping)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StructuralType::Scalar => "scalar",
            StructuralType::Sequence => "sequence",
            StructuralType::Mapping => "mapping",
            StructuralType::Absent => "absent",
        }
    }
}

impl fmt::Display for StructuralType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Size and field count of one path in one document
///
/// Field order is the column order of the attribute-sizes report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Measurement {
    pub document_id: DocumentId,
    pub attribute_path: AttributePath,
    pub structural_type: StructuralType,
    /// Length of the compact JSON serialization of the value
    pub size_bytes: u64,
    /// Keys and element slots contained at every depth below the path
    pub field_count: u64,
    pub depth: usize,
}

impl Measurement {
    pub fn absent(document_id: DocumentId, attribute_path: AttributePath) -> Self {
        let depth = attribute_path.depth();
        Measurement {
            document_id,
            attribute_path,
            structural_type: StructuralType::Absent,
            size_bytes: 0,
            field_count: 0,
            depth,
        }
    }
}

impl Tabular for Measurement {
    const REPORT_NAME: &'static str = "attribute_sizes";
    const COLUMNS: &'static [&'static str] = &[
        "document_id",
        "attribute_path",
        "structural_type",
        "size_bytes",
        "field_count",
        "depth",
    ];
}

/// What to do with a document holding a value outside the document model or
/// a repeated mapping key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Drop every measurement of the document
    #[default]
    SkipDocument,
    /// Treat the offending value as missing and measure the rest
    SkipValue,
}

/// Configuration for the measuring pass
#[derive(Debug, Clone, Copy, Default)]
pub struct MeasureConfig {
    pub on_malformed: MalformedPolicy,
}
