use crate::measure::types::Measurement;
use parking_lot::Mutex;

/// Append-only log of measurements for one corpus run
///
/// `append` takes `&self` so measuring workers can share the store.
#[derive(Debug, Default)]
pub struct MeasurementStore {
    rows: Mutex<Vec<Measurement>>,
}

impl MeasurementStore {
    pub fn new() -> Self {
        MeasurementStore::default()
    }

    /// Append one document's measurements as a single batch
    pub fn append(&self, measurements: Vec<Measurement>) {
        if measurements.is_empty() {
            return;
        }
        self.rows.lock().extend(measurements);
    }

    /// Snapshot of every row appended so far
    pub fn rows(&self) -> Vec<Measurement> {
        self.rows.lock().clone()
    }

    /// Borrow the rows without copying them
    pub fn with_rows<R>(&self, f: impl FnOnce(&[Measurement]) -> R) -> R {
        f(&self.rows.lock())
    }

    pub fn len(&self) -> usize {
        self.rows.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn into_rows(self) -> Vec<Measurement> {
        self.rows.into_inner()
    }
}
