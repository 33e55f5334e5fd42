//! Structural measurement of documents
//!
//! A `PathCatalog` is built once over the whole corpus; a `StructuralMeasurer`
//! then walks each document and emits exactly one `Measurement` per catalogued
//! path, appending them to a shared `MeasurementStore`.

pub mod catalog;
pub mod measurer;
pub mod store;
pub mod types;

pub use catalog::PathCatalog;
pub use measurer::{MeasureOutcome, StructuralMeasurer};
pub use store::MeasurementStore;
pub use types::{MalformedPolicy, MeasureConfig, Measurement, StructuralType};
