use crate::document::DocumentId;
use crate::path::AttributePath;
use thiserror::Error;

/// Failures raised while measuring a single document
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MeasureError {
    /// The document holds a value that is neither scalar, sequence nor mapping
    #[error("document {document_id}: unsupported value of type `{type_name}` at {path}")]
    MalformedDocument {
        document_id: DocumentId,
        path: AttributePath,
        type_name: String,
    },

    /// A mapping names the same key twice; `path` is the repeated member
    #[error("document {document_id}: duplicate key at {path}")]
    DuplicateKey {
        document_id: DocumentId,
        path: AttributePath,
    },
}

impl MeasureError {
    pub fn document_id(&self) -> &DocumentId {
        match self {
            MeasureError::MalformedDocument { document_id, .. }
            | MeasureError::DuplicateKey { document_id, .. } => document_id,
        }
    }

    /// Path of the offending value
    pub fn path(&self) -> &AttributePath {
        match self {
            MeasureError::MalformedDocument { path, .. } | MeasureError::DuplicateKey { path, .. } => {
                path
            }
        }
    }
}

/// Failure to parse a rendered attribute path such as `b[0].x`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid attribute path `{input}` at byte {offset}")]
pub struct PathParseError {
    pub input: String,
    pub offset: usize,
}
