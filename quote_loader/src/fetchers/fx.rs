use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tracing::{debug, warn};

use crate::fetchers::{InstrumentFetcher, OHLC_FIELDS, daily_request, non_empty, ohlc, points_for};
use crate::models::date_range::DateRange;
use crate::models::instrument::{Instrument, InstrumentClass};
use crate::models::quote_row::{FxDetails, QuoteRow, RowDetails};
use crate::providers::{FieldObservation, Frequency, ProviderError, QuoteProvider};

pub const BID_FIELD: &str = "TR.BIDPRICE";
pub const ASK_FIELD: &str = "TR.ASKPRICE";
pub const MID_FIELD: &str = "TR.MIDPRICE";

/// Daily OHLC from the time series, with bid/ask/mid merged on by date.
#[derive(Debug, Clone, Copy, Default)]
pub struct FxFetcher;

#[async_trait]
impl InstrumentFetcher for FxFetcher {
    fn class(&self) -> InstrumentClass {
        InstrumentClass::Fx
    }

    async fn fetch(
        &self,
        provider: &dyn QuoteProvider,
        instrument: &Instrument,
        range: &DateRange,
    ) -> Result<Vec<QuoteRow>, ProviderError> {
        let id = instrument.id.as_str();
        let request = daily_request(instrument, &OHLC_FIELDS, range);
        let series = provider.fetch_time_series(&request).await?;

        let mut rows = Vec::new();
        for point in points_for(series, id) {
            let Some(ohlc) = ohlc(&point) else {
                debug!(instrument = id, date = %point.date, "dropping row with missing OHLC");
                continue;
            };
            rows.push(QuoteRow {
                date: point.date,
                instrument: id.to_string(),
                ohlc,
                details: RowDetails::Fx(FxDetails::default()),
            });
        }
        let mut rows = non_empty(id, rows)?;

        let bid = supplementary(provider, id, BID_FIELD, range).await?;
        let ask = supplementary(provider, id, ASK_FIELD, range).await?;
        let mid = supplementary(provider, id, MID_FIELD, range).await?;

        for row in &mut rows {
            row.details = RowDetails::Fx(FxDetails {
                bid: bid.get(&row.date).copied(),
                ask: ask.get(&row.date).copied(),
                mid: mid.get(&row.date).copied(),
            });
        }
        Ok(rows)
    }
}

async fn supplementary(
    provider: &dyn QuoteProvider,
    id: &str,
    field: &str,
    range: &DateRange,
) -> Result<HashMap<NaiveDate, f64>, ProviderError> {
    let observations = provider
        .fetch_field_history(id, field, range, Frequency::Daily)
        .await?;
    let by_date = by_date(observations);
    if by_date.is_empty() {
        warn!(instrument = id, field, "no observations for supplementary field");
    }
    Ok(by_date)
}

/// Drops empty observations; a later observation for the same date wins.
fn by_date(observations: Vec<FieldObservation>) -> HashMap<NaiveDate, f64> {
    observations
        .into_iter()
        .filter_map(|o| o.value.map(|v| (o.date, v)))
        .collect()
}
