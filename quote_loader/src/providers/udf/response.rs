use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::Deserialize;
use serde_json::Value;

use crate::providers::udf::params::TIMESTAMP_FIELD;
use crate::providers::{
    DecodeSnafu, FieldObservation, MetadataRecord, ProviderError, TimeSeries, TimeSeriesPoint,
};

/// Whole-request failure reported by the proxy instead of a payload.
#[derive(Debug, Default, Deserialize)]
pub struct ProxyFault {
    #[serde(rename = "ErrorCode")]
    pub code: Option<Value>,
    #[serde(rename = "ErrorMessage")]
    pub message: Option<String>,
}

impl ProxyFault {
    fn into_error(self, instrument: Option<&str>) -> Option<ProviderError> {
        let message = self.message?;
        let message = match self.code {
            Some(code) => format!("Error code {code} | {message}"),
            None => message,
        };
        Some(ProviderError::from_message(instrument, message))
    }
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    #[serde(rename = "statusCode")]
    pub status_code: String,
}

impl StatusResponse {
    pub fn is_ready(&self) -> bool {
        self.status_code == "ST_PROXY_READY"
    }
}

#[derive(Debug, Deserialize)]
pub struct TimeSeriesResponse {
    #[serde(rename = "timeseriesData", default)]
    pub series: Vec<RawSeries>,
    #[serde(flatten)]
    pub fault: ProxyFault,
}

#[derive(Debug, Deserialize)]
pub struct RawSeries {
    pub ric: String,
    #[serde(rename = "statusCode", default)]
    pub status_code: Option<String>,
    #[serde(rename = "errorMessage", default)]
    pub error_message: Option<String>,
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(rename = "dataPoints", default)]
    pub data_points: Vec<Vec<Value>>,
}

#[derive(Debug, Deserialize)]
pub struct RawField {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct DataGridResponse {
    #[serde(default)]
    pub responses: Vec<RawGrid>,
    #[serde(flatten)]
    pub fault: ProxyFault,
}

#[derive(Debug, Deserialize)]
pub struct RawGrid {
    #[serde(default)]
    pub headers: Vec<Vec<RawHeader>>,
    #[serde(default)]
    pub data: Vec<Vec<Value>>,
    #[serde(default)]
    pub error: Vec<RawGridError>,
}

#[derive(Debug, Deserialize)]
pub struct RawHeader {
    #[serde(rename = "displayName", default)]
    pub display_name: String,
    #[serde(default)]
    pub field: Option<String>,
}

impl RawHeader {
    fn matches(&self, name: &str) -> bool {
        self.field
            .as_deref()
            .is_some_and(|f| f.eq_ignore_ascii_case(name))
            || self.display_name.eq_ignore_ascii_case(name)
    }
}

#[derive(Debug, Deserialize)]
pub struct RawGridError {
    #[serde(default)]
    pub message: String,
}

impl TimeSeriesResponse {
    pub fn into_time_series(self) -> Result<Vec<TimeSeries>, ProviderError> {
        if let Some(err) = self.fault.into_error(None) {
            return Err(err);
        }

        let mut out = Vec::with_capacity(self.series.len());
        for raw in self.series {
            if raw.status_code.as_deref() == Some("Error") {
                let message = raw
                    .error_message
                    .unwrap_or_else(|| "time series request failed".to_string());
                return Err(ProviderError::from_message(Some(&raw.ric), message));
            }

            let ts_index = raw
                .fields
                .iter()
                .position(|f| f.name.eq_ignore_ascii_case(TIMESTAMP_FIELD))
                .ok_or_else(|| {
                    DecodeSnafu {
                        message: format!("{}: time series without {TIMESTAMP_FIELD}", raw.ric),
                    }
                    .build()
                })?;

            let mut points = Vec::with_capacity(raw.data_points.len());
            for row in &raw.data_points {
                let date = row.get(ts_index).and_then(cell_date).ok_or_else(|| {
                    DecodeSnafu {
                        message: format!("{}: undated data point", raw.ric),
                    }
                    .build()
                })?;
                let values = raw
                    .fields
                    .iter()
                    .enumerate()
                    .filter(|(i, _)| *i != ts_index)
                    .map(|(i, f)| (f.name.to_ascii_uppercase(), row.get(i).and_then(cell_f64)))
                    .collect();
                points.push(TimeSeriesPoint { date, values });
            }

            out.push(TimeSeries {
                instrument: raw.ric,
                points,
            });
        }
        Ok(out)
    }
}

impl DataGridResponse {
    fn into_grid(self, instrument: Option<&str>) -> Result<Option<RawGrid>, ProviderError> {
        if let Some(err) = self.fault.into_error(instrument) {
            return Err(err);
        }
        let Some(grid) = self.responses.into_iter().next() else {
            return Ok(None);
        };
        if grid.data.is_empty() {
            if let Some(first) = grid.error.first() {
                return Err(ProviderError::from_message(instrument, first.message.clone()));
            }
            return Ok(None);
        }
        Ok(Some(grid))
    }

    /// One record per returned row; the first column is the instrument code.
    pub fn into_metadata(
        self,
        fields: &[String],
    ) -> Result<Option<Vec<MetadataRecord>>, ProviderError> {
        let Some(grid) = self.into_grid(None)? else {
            return Ok(None);
        };
        let header = grid.headers.last().map(Vec::as_slice).unwrap_or_default();
        let columns: Vec<(String, Option<usize>)> = fields
            .iter()
            .map(|name| (name.clone(), header.iter().position(|h| h.matches(name))))
            .collect();

        let records = grid
            .data
            .iter()
            .filter_map(|row| {
                let instrument = row.first().and_then(cell_string)?;
                let values = columns
                    .iter()
                    .map(|(name, idx)| {
                        let value = idx.and_then(|i| row.get(i)).and_then(cell_string);
                        (name.clone(), value)
                    })
                    .collect::<IndexMap<_, _>>();
                Some(MetadataRecord { instrument, values })
            })
            .collect::<Vec<_>>();

        Ok((!records.is_empty()).then_some(records))
    }

    /// Dated observations of `field`. Rows without a parseable date are skipped.
    pub fn into_field_history(
        self,
        instrument: &str,
        field: &str,
    ) -> Result<Vec<FieldObservation>, ProviderError> {
        let Some(grid) = self.into_grid(Some(instrument))? else {
            return Ok(Vec::new());
        };
        let header = grid.headers.last().map(Vec::as_slice).unwrap_or_default();
        let date_field = format!("{field}.date");
        let date_idx = header
            .iter()
            .position(|h| h.matches(&date_field))
            .or_else(|| header.iter().position(|h| h.matches("Date")))
            .unwrap_or(1);
        let value_idx = header
            .iter()
            .position(|h| h.matches(field))
            .unwrap_or_else(|| header.len().max(3) - 1);

        Ok(grid
            .data
            .iter()
            .filter_map(|row| {
                let date = row.get(date_idx).and_then(cell_date)?;
                let value = row.get(value_idx).and_then(cell_f64);
                Some(FieldObservation { date, value })
            })
            .collect())
    }
}

/// Dates arrive as `2024-01-02T00:00:00Z`; only the calendar day matters.
fn cell_date(value: &Value) -> Option<NaiveDate> {
    let text = value.as_str()?;
    let day = text.get(..10)?;
    NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
}

fn cell_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    }
}

fn cell_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
