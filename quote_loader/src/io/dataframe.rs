//! Conversion of normalized rows into the per-class artifact schema.

use polars::prelude::*;
use snafu::ResultExt;

use crate::io::sink::{ConversionSnafu, PolarsSnafu, SinkError};
use crate::models::date_range::PROVIDER_DATE_FORMAT;
use crate::models::instrument::InstrumentClass;
use crate::models::quote_row::{QuoteRow, RowDetails};

pub const FX_COLUMNS: [&str; 9] = [
    "date", "instrument", "high", "low", "open", "close", "bid", "ask", "mid",
];

pub const GAS_COLUMNS: [&str; 9] = [
    "date",
    "instrument",
    "orig_high",
    "orig_low",
    "orig_open",
    "orig_close",
    "volume",
    "orig_currency",
    "orig_unit",
];

/// Builds the artifact table for `class`. Every row must belong to that class.
pub fn rows_to_dataframe(
    class: InstrumentClass,
    rows: &[QuoteRow],
) -> Result<DataFrame, SinkError> {
    match class {
        InstrumentClass::Fx => fx_frame(rows),
        InstrumentClass::Gas => gas_frame(rows),
    }
}

struct Common {
    date: Vec<String>,
    instrument: Vec<String>,
    high: Vec<f64>,
    low: Vec<f64>,
    open: Vec<f64>,
    close: Vec<f64>,
}

impl Common {
    fn collect(rows: &[QuoteRow]) -> Self {
        Self {
            date: rows
                .iter()
                .map(|r| r.date.format(PROVIDER_DATE_FORMAT).to_string())
                .collect(),
            instrument: rows.iter().map(|r| r.instrument.clone()).collect(),
            high: rows.iter().map(|r| r.ohlc.high).collect(),
            low: rows.iter().map(|r| r.ohlc.low).collect(),
            open: rows.iter().map(|r| r.ohlc.open).collect(),
            close: rows.iter().map(|r| r.ohlc.close).collect(),
        }
    }
}

fn fx_frame(rows: &[QuoteRow]) -> Result<DataFrame, SinkError> {
    let mut bid = Vec::with_capacity(rows.len());
    let mut ask = Vec::with_capacity(rows.len());
    let mut mid = Vec::with_capacity(rows.len());
    for row in rows {
        let RowDetails::Fx(fx) = &row.details else {
            return ConversionSnafu {
                message: format!("{} is not an FX row", row.instrument),
            }
            .fail();
        };
        bid.push(fx.bid);
        ask.push(fx.ask);
        mid.push(fx.mid);
    }

    let c = Common::collect(rows);
    df!(
        FX_COLUMNS[0] => c.date,
        FX_COLUMNS[1] => c.instrument,
        FX_COLUMNS[2] => c.high,
        FX_COLUMNS[3] => c.low,
        FX_COLUMNS[4] => c.open,
        FX_COLUMNS[5] => c.close,
        FX_COLUMNS[6] => bid,
        FX_COLUMNS[7] => ask,
        FX_COLUMNS[8] => mid,
    )
    .context(PolarsSnafu)
}

fn gas_frame(rows: &[QuoteRow]) -> Result<DataFrame, SinkError> {
    let mut volume = Vec::with_capacity(rows.len());
    let mut currency = Vec::with_capacity(rows.len());
    let mut unit = Vec::with_capacity(rows.len());
    for row in rows {
        let RowDetails::Gas(gas) = &row.details else {
            return ConversionSnafu {
                message: format!("{} is not a gas row", row.instrument),
            }
            .fail();
        };
        volume.push(gas.volume);
        currency.push(gas.currency.clone());
        unit.push(gas.unit.clone());
    }

    let c = Common::collect(rows);
    df!(
        GAS_COLUMNS[0] => c.date,
        GAS_COLUMNS[1] => c.instrument,
        GAS_COLUMNS[2] => c.high,
        GAS_COLUMNS[3] => c.low,
        GAS_COLUMNS[4] => c.open,
        GAS_COLUMNS[5] => c.close,
        GAS_COLUMNS[6] => volume,
        GAS_COLUMNS[7] => currency,
        GAS_COLUMNS[8] => unit,
    )
    .context(PolarsSnafu)
}
