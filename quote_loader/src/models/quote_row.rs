//! Normalized per-day rows produced by the instrument fetchers.
//!
//! Every row is keyed by `(date, instrument)`. The OHLC part is common to both
//! classes; [`RowDetails`] carries the class-specific columns so an artifact of one
//! class always has a uniform schema.

use chrono::NaiveDate;

/// Daily open/high/low/close values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ohlc {
    pub high: f64,
    pub low: f64,
    pub open: f64,
    pub close: f64,
}

/// Supplementary FX quotes merged onto the time series by date.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FxDetails {
    pub bid: Option<f64>,
    pub ask: Option<f64>,
    pub mid: Option<f64>,
}

/// Gas volume plus the currency/unit the prices are quoted in.
#[derive(Debug, Clone, PartialEq)]
pub struct GasDetails {
    /// Always `None` for volume-less instruments; the column is still written.
    pub volume: Option<f64>,
    pub currency: String,
    pub unit: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RowDetails {
    Fx(FxDetails),
    Gas(GasDetails),
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteRow {
    pub date: NaiveDate,
    pub instrument: String,
    pub ohlc: Ohlc,
    pub details: RowDetails,
}

impl QuoteRow {
    /// Sort key for the artifact.
    pub fn key(&self) -> (NaiveDate, &str) {
        (self.date, self.instrument.as_str())
    }
}
