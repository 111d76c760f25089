use async_trait::async_trait;
use tracing::debug;

use crate::fetchers::{InstrumentFetcher, OHLC_FIELDS, daily_request, non_empty, ohlc, points_for};
use crate::models::date_range::DateRange;
use crate::models::instrument::{GasAttributes, Instrument, InstrumentClass};
use crate::models::quote_row::{GasDetails, QuoteRow, RowDetails};
use crate::providers::{MetadataRecord, ProviderError, QuoteProvider};

pub const CURRENCY_FIELD: &str = "CF_CURR";
pub const UNIT_FIELD: &str = "LOTSZUNITS";
pub const VOLUME_FIELD: &str = "VOLUME";

pub const DEFAULT_CURRENCY: &str = "EUR";
pub const DEFAULT_UNIT: &str = "MWh";

/// Daily OHLC (and volume where the hub publishes one) plus quote currency and unit.
#[derive(Debug, Clone, Copy, Default)]
pub struct GasFetcher;

#[async_trait]
impl InstrumentFetcher for GasFetcher {
    fn class(&self) -> InstrumentClass {
        InstrumentClass::Gas
    }

    async fn fetch(
        &self,
        provider: &dyn QuoteProvider,
        instrument: &Instrument,
        range: &DateRange,
    ) -> Result<Vec<QuoteRow>, ProviderError> {
        let id = instrument.id.as_str();
        let attrs = instrument.gas_attributes().cloned().unwrap_or_default();

        let metadata = provider
            .fetch_metadata(
                &[instrument.id.clone()],
                &[CURRENCY_FIELD.to_string(), UNIT_FIELD.to_string()],
            )
            .await?;
        let record = metadata
            .unwrap_or_default()
            .into_iter()
            .find(|r| r.instrument == id);
        let (currency, unit) = quote_terms(record.as_ref(), &attrs);
        debug!(instrument = id, %currency, %unit, "resolved quote terms");

        // The provider errors on a field that is always empty, so volume is only
        // requested for hubs that publish it.
        let mut fields = OHLC_FIELDS.to_vec();
        if attrs.has_volume {
            fields.push(VOLUME_FIELD);
        }
        let request = daily_request(instrument, &fields, range);
        let series = provider.fetch_time_series(&request).await?;

        let mut rows = Vec::new();
        for point in points_for(series, id) {
            let Some(ohlc) = ohlc(&point) else {
                debug!(instrument = id, date = %point.date, "dropping row with missing OHLC");
                continue;
            };
            let volume = if attrs.has_volume {
                match point.value(VOLUME_FIELD) {
                    Some(v) => Some(v),
                    None => {
                        debug!(
                            instrument = id,
                            date = %point.date,
                            "dropping row with missing volume"
                        );
                        continue;
                    }
                }
            } else {
                None
            };
            rows.push(QuoteRow {
                date: point.date,
                instrument: id.to_string(),
                ohlc,
                details: RowDetails::Gas(GasDetails {
                    volume,
                    currency: currency.clone(),
                    unit: unit.clone(),
                }),
            });
        }
        non_empty(id, rows)
    }
}

/// Currency and unit for an instrument. The catalog unit wins over the fetched one;
/// blank or missing values fall back to EUR / MWh.
pub fn quote_terms(record: Option<&MetadataRecord>, attrs: &GasAttributes) -> (String, String) {
    let fetched = |field: &str| {
        record
            .and_then(|r| r.value(field))
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let currency = fetched(CURRENCY_FIELD).unwrap_or(DEFAULT_CURRENCY).to_string();
    let unit = attrs
        .default_unit
        .as_deref()
        .or_else(|| fetched(UNIT_FIELD))
        .unwrap_or(DEFAULT_UNIT)
        .to_string();
    (currency, unit)
}
