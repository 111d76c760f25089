use chrono::NaiveDate;
use serde::Serialize;

use crate::models::date_range::DateRange;
use crate::providers::{Frequency, TimeSeriesRequest};

pub const TIME_SERIES_DIRECTION: &str = "TimeSeries";
pub const DATA_GRID_DIRECTION: &str = "DataGrid_StandardAsync";

/// Column the proxy prepends to every time-series data point.
pub const TIMESTAMP_FIELD: &str = "TIMESTAMP";

const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// `{"Entity": {"E": <direction>, "W": <payload>}}`
#[derive(Debug, Serialize)]
pub struct Envelope<'a, W: Serialize> {
    #[serde(rename = "Entity")]
    pub entity: Entity<'a, W>,
}

#[derive(Debug, Serialize)]
pub struct Entity<'a, W: Serialize> {
    #[serde(rename = "E")]
    pub direction: &'a str,
    #[serde(rename = "W")]
    pub payload: W,
}

impl<'a, W: Serialize> Envelope<'a, W> {
    pub fn new(direction: &'a str, payload: W) -> Self {
        Self {
            entity: Entity { direction, payload },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimeSeriesPayload {
    pub rics: Vec<String>,
    pub fields: Vec<String>,
    pub interval: String,
    pub startdate: String,
    pub enddate: String,
}

#[derive(Debug, Serialize)]
pub struct DataGridPayload {
    pub requests: Vec<DataGridRequest>,
}

#[derive(Debug, Serialize)]
pub struct DataGridRequest {
    pub instruments: Vec<String>,
    pub fields: Vec<FieldName>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<DataGridParameters>,
}

#[derive(Debug, Serialize)]
pub struct FieldName {
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct DataGridParameters {
    #[serde(rename = "SDate")]
    pub start: String,
    #[serde(rename = "EDate")]
    pub end: String,
    #[serde(rename = "FRQ")]
    pub frequency: String,
}

/// Builds the time-series payload. The timestamp column is always requested first so
/// data points can be dated.
pub fn construct_time_series(request: &TimeSeriesRequest) -> TimeSeriesPayload {
    let mut fields = Vec::with_capacity(request.fields.len() + 1);
    fields.push(TIMESTAMP_FIELD.to_string());
    fields.extend(
        request
            .fields
            .iter()
            .filter(|f| !f.eq_ignore_ascii_case(TIMESTAMP_FIELD))
            .cloned(),
    );

    TimeSeriesPayload {
        rics: request.instruments.clone(),
        fields,
        interval: request.interval.as_str().to_string(),
        startdate: format_timestamp(request.range.start()),
        enddate: format_timestamp(request.range.end()),
    }
}

pub fn construct_metadata(instruments: &[String], fields: &[String]) -> DataGridPayload {
    DataGridPayload {
        requests: vec![DataGridRequest {
            instruments: instruments.to_vec(),
            fields: fields
                .iter()
                .map(|name| FieldName { name: name.clone() })
                .collect(),
            parameters: None,
        }],
    }
}

/// Field history is a data-grid request for `<field>.date` and `<field>` with a date
/// window.
pub fn construct_field_history(
    instrument: &str,
    field: &str,
    range: &DateRange,
    frequency: Frequency,
) -> DataGridPayload {
    DataGridPayload {
        requests: vec![DataGridRequest {
            instruments: vec![instrument.to_string()],
            fields: vec![
                FieldName {
                    name: format!("{field}.date"),
                },
                FieldName {
                    name: field.to_string(),
                },
            ],
            parameters: Some(DataGridParameters {
                start: range.start().format("%Y-%m-%d").to_string(),
                end: range.end().format("%Y-%m-%d").to_string(),
                frequency: frequency.as_str().to_string(),
            }),
        }],
    }
}

fn format_timestamp(date: NaiveDate) -> String {
    date.and_hms_opt(0, 0, 0)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}
