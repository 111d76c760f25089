//! Per-class conversion of provider responses into [`QuoteRow`]s.
//!
//! A fetcher handles exactly one instrument per call; retries and pacing belong to the
//! caller. Rows missing a required value are dropped, and a fetch that ends up with no
//! rows at all is reported as [`ErrorClass::NoData`](crate::providers::ErrorClass).

pub mod fx;
pub mod gas;

use async_trait::async_trait;

use crate::models::date_range::DateRange;
use crate::models::instrument::{Instrument, InstrumentClass};
use crate::models::quote_row::{Ohlc, QuoteRow};
use crate::providers::{
    Interval, NoDataSnafu, ProviderError, QuoteProvider, TimeSeries, TimeSeriesPoint,
    TimeSeriesRequest,
};

pub use fx::FxFetcher;
pub use gas::GasFetcher;

pub const HIGH: &str = "HIGH";
pub const LOW: &str = "LOW";
pub const OPEN: &str = "OPEN";
pub const CLOSE: &str = "CLOSE";
pub const OHLC_FIELDS: [&str; 4] = [HIGH, LOW, OPEN, CLOSE];

#[async_trait]
pub trait InstrumentFetcher: Send + Sync {
    fn class(&self) -> InstrumentClass;

    /// Normalized rows for one instrument over `range`, unsorted.
    async fn fetch(
        &self,
        provider: &dyn QuoteProvider,
        instrument: &Instrument,
        range: &DateRange,
    ) -> Result<Vec<QuoteRow>, ProviderError>;
}

/// The fetcher responsible for `class`.
pub fn fetcher_for(class: InstrumentClass) -> Box<dyn InstrumentFetcher> {
    match class {
        InstrumentClass::Fx => Box::new(FxFetcher),
        InstrumentClass::Gas => Box::new(GasFetcher),
    }
}

pub(crate) fn daily_request(
    instrument: &Instrument,
    fields: &[&str],
    range: &DateRange,
) -> TimeSeriesRequest {
    TimeSeriesRequest {
        instruments: vec![instrument.id.clone()],
        fields: fields.iter().map(|f| f.to_string()).collect(),
        range: *range,
        interval: Interval::Daily,
    }
}

/// Points of the series belonging to `id`. A single unnamed series is accepted as is.
pub(crate) fn points_for(series: Vec<TimeSeries>, id: &str) -> Vec<TimeSeriesPoint> {
    let single = series.len() == 1;
    series
        .into_iter()
        .find(|s| s.instrument == id || single)
        .map(|s| s.points)
        .unwrap_or_default()
}

pub(crate) fn ohlc(point: &TimeSeriesPoint) -> Option<Ohlc> {
    Some(Ohlc {
        high: point.value(HIGH)?,
        low: point.value(LOW)?,
        open: point.value(OPEN)?,
        close: point.value(CLOSE)?,
    })
}

/// Turns an empty result into a no-data error.
pub(crate) fn non_empty(id: &str, rows: Vec<QuoteRow>) -> Result<Vec<QuoteRow>, ProviderError> {
    if rows.is_empty() {
        return NoDataSnafu { instrument: id }.fail();
    }
    Ok(rows)
}
