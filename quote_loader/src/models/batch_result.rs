use std::path::PathBuf;

use crate::models::{date_range::DateRange, instrument::InstrumentClass, quote_row::QuoteRow};

/// Outcome of one collector run for a single (class, chunk) pair.
///
/// Owned by the collector while the run is in progress; handed back to the caller
/// once the artifact is written and the notification dispatched.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult {
    pub class: InstrumentClass,
    pub range: DateRange,
    /// Rows of every instrument that produced data, in `(date, instrument)` order once
    /// the run is finalized.
    pub rows: Vec<QuoteRow>,
    /// Human readable per-instrument failures, in catalog order.
    pub errors: Vec<String>,
    /// Absent when no instrument produced rows.
    pub artifact_path: Option<PathBuf>,
}

impl BatchResult {
    pub fn new(class: InstrumentClass, range: DateRange) -> Self {
        Self {
            class,
            range,
            rows: Vec::new(),
            errors: Vec::new(),
            artifact_path: None,
        }
    }

    pub fn has_rows(&self) -> bool {
        !self.rows.is_empty()
    }
}
