//! Provider abstraction for the quote source.
//!
//! This module defines the [`QuoteProvider`] trait, the boundary between the
//! orchestration core and whatever actually talks to the vendor. The core only ever
//! needs three calls:
//!
//! - a daily time series for a set of instruments,
//! - static metadata (currency, lot units) for a set of instruments,
//! - the daily history of a single data field for one instrument.
//!
//! Every failure is a [`ProviderError`], and every [`ProviderError`] maps onto an
//! [`ErrorClass`]. The retry policy decides what to do purely from that class.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use quote_loader::models::date_range::DateRange;
//! use quote_loader::providers::{
//!     FieldObservation, Frequency, MetadataRecord, ProviderError, QuoteProvider, TimeSeries,
//!     TimeSeriesRequest,
//! };
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl QuoteProvider for Offline {
//!     async fn fetch_time_series(
//!         &self,
//!         _request: &TimeSeriesRequest,
//!     ) -> Result<Vec<TimeSeries>, ProviderError> {
//!         Ok(vec![])
//!     }
//!
//!     async fn fetch_metadata(
//!         &self,
//!         _instruments: &[String],
//!         _fields: &[String],
//!     ) -> Result<Option<Vec<MetadataRecord>>, ProviderError> {
//!         Ok(None)
//!     }
//!
//!     async fn fetch_field_history(
//!         &self,
//!         _instrument: &str,
//!         _field: &str,
//!         _range: &DateRange,
//!         _frequency: Frequency,
//!     ) -> Result<Vec<FieldObservation>, ProviderError> {
//!         Ok(vec![])
//!     }
//! }
//! ```

pub mod udf;

use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use reqwest::StatusCode;
use snafu::{Backtrace, Snafu};

use crate::models::date_range::DateRange;

/// Bar interval for time-series requests. Only daily bars are ever requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interval {
    #[default]
    Daily,
}

impl Interval {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "daily",
        }
    }
}

/// Sampling frequency for field-history requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Frequency {
    #[default]
    Daily,
}

impl Frequency {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Daily => "D",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRequest {
    pub instruments: Vec<String>,
    pub fields: Vec<String>,
    pub range: DateRange,
    pub interval: Interval,
}

/// One dated observation of a time series. Fields the provider left empty are `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub values: IndexMap<String, Option<f64>>,
}

impl TimeSeriesPoint {
    pub fn value(&self, field: &str) -> Option<f64> {
        self.values.get(field).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    pub instrument: String,
    pub points: Vec<TimeSeriesPoint>,
}

/// Static attributes of one instrument, keyed by provider field name.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataRecord {
    pub instrument: String,
    pub values: IndexMap<String, Option<String>>,
}

impl MetadataRecord {
    pub fn value(&self, field: &str) -> Option<&str> {
        self.values.get(field).and_then(|v| v.as_deref())
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldObservation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

/// Trait for fetching quotes from the data provider.
///
/// Implementations must classify their failures through [`ProviderError`]; the
/// orchestration layer never inspects raw vendor messages.
#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Daily time series for `request.instruments` over `request.range`.
    async fn fetch_time_series(
        &self,
        request: &TimeSeriesRequest,
    ) -> Result<Vec<TimeSeries>, ProviderError>;

    /// Static metadata. `Ok(None)` means the provider answered but had nothing.
    async fn fetch_metadata(
        &self,
        instruments: &[String],
        fields: &[String],
    ) -> Result<Option<Vec<MetadataRecord>>, ProviderError>;

    /// Daily history of a single data field, e.g. a bid price.
    async fn fetch_field_history(
        &self,
        instrument: &str,
        field: &str,
        range: &DateRange,
        frequency: Frequency,
    ) -> Result<Vec<FieldObservation>, ProviderError>;
}

/// How the retry policy must treat a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The instrument has nothing for the window. Recorded, not retried.
    NoData,
    /// Timeout or gateway unavailable. Retried after the retry delay.
    UpstreamBusy,
    /// Malformed or refused request. Skipped silently.
    RequestRejected,
    /// Anything else. Recorded with its message, not retried.
    Other,
}

/// Errors that can occur within a `QuoteProvider` implementation.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum ProviderError {
    /// The provider explicitly reported an empty window for the instrument.
    #[snafu(display("{instrument}: No data available for the requested date range"))]
    NoData {
        instrument: String,
        backtrace: Backtrace,
    },

    /// The provider (or its gateway) did not answer in time.
    #[snafu(display("Upstream busy: {message}"))]
    UpstreamBusy {
        message: String,
        backtrace: Backtrace,
    },

    /// The provider refused the request as malformed.
    #[snafu(display("Request rejected: {message}"))]
    Rejected {
        message: String,
        backtrace: Backtrace,
    },

    /// An error during an API request (e.g., network failure, timeout).
    #[snafu(display("API request failed: {source}"))]
    Reqwest {
        source: reqwest::Error,
        backtrace: Backtrace,
    },

    /// The provider's API returned a specific error message.
    #[snafu(display("API error: {message}"))]
    Api {
        message: String,
        backtrace: Backtrace,
    },

    /// The response did not have the expected shape.
    #[snafu(display("Failed to decode provider response: {message}"))]
    Decode {
        message: String,
        backtrace: Backtrace,
    },

    /// No application key registered, or the local proxy is not ready.
    #[snafu(display("Provider is not connected: {message}"))]
    NotConnected {
        message: String,
        backtrace: Backtrace,
    },
}

impl ProviderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::NoData { .. } => ErrorClass::NoData,
            Self::UpstreamBusy { .. } => ErrorClass::UpstreamBusy,
            Self::Rejected { .. } => ErrorClass::RequestRejected,
            Self::Reqwest { source, .. } => {
                if source.is_timeout() || source.is_connect() {
                    ErrorClass::UpstreamBusy
                } else {
                    source
                        .status()
                        .map(classify_status)
                        .unwrap_or(ErrorClass::Other)
                }
            }
            Self::Api { message, .. } => classify_message(message),
            Self::Decode { .. } | Self::NotConnected { .. } => ErrorClass::Other,
        }
    }

    /// Builds the most specific error for a raw vendor message.
    ///
    /// `instrument` is used for no-data messages that do not name the series
    /// themselves.
    pub fn from_message(instrument: Option<&str>, message: impl Into<String>) -> Self {
        let message = message.into();
        match classify_message(&message) {
            ErrorClass::NoData => {
                let detail = message
                    .strip_prefix("Error code")
                    .and_then(|rest| rest.split_once('|'))
                    .map_or(message.as_str(), |(_, detail)| detail);
                let instrument = detail
                    .split_once(':')
                    .map(|(prefix, _)| prefix.trim().to_string())
                    .filter(|prefix| !prefix.is_empty() && !prefix.contains(' '))
                    .or_else(|| instrument.map(str::to_string))
                    .unwrap_or_default();
                NoDataSnafu { instrument }.build()
            }
            ErrorClass::UpstreamBusy => UpstreamBusySnafu { message }.build(),
            ErrorClass::RequestRejected => RejectedSnafu { message }.build(),
            ErrorClass::Other => ApiSnafu { message }.build(),
        }
    }

    /// Builds an error from a non-success HTTP status and its body.
    pub fn from_status(status: StatusCode, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            status.to_string()
        } else {
            format!("{status}: {}", body.trim())
        };
        match classify_status(status) {
            ErrorClass::UpstreamBusy => UpstreamBusySnafu { message }.build(),
            ErrorClass::RequestRejected => RejectedSnafu { message }.build(),
            _ => Self::from_message(None, message),
        }
    }
}

/// Classifies a raw vendor error message.
pub fn classify_message(message: &str) -> ErrorClass {
    let lower = message.to_ascii_lowercase();
    if lower.contains("no data available for the requested date range") {
        ErrorClass::NoData
    } else if lower.contains("gateway time-out")
        || lower.contains("gateway timeout")
        || lower.contains("service unavailable")
    {
        ErrorClass::UpstreamBusy
    } else if lower.contains("400 bad request") {
        ErrorClass::RequestRejected
    } else {
        ErrorClass::Other
    }
}

fn classify_status(status: StatusCode) -> ErrorClass {
    match status {
        StatusCode::BAD_REQUEST => ErrorClass::RequestRejected,
        StatusCode::REQUEST_TIMEOUT
        | StatusCode::BAD_GATEWAY
        | StatusCode::SERVICE_UNAVAILABLE
        | StatusCode::GATEWAY_TIMEOUT => ErrorClass::UpstreamBusy,
        _ => ErrorClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vendor_messages_are_classified() {
        assert_eq!(
            classify_message("UDF Core request failed. Gateway Time-out"),
            ErrorClass::UpstreamBusy
        );
        assert_eq!(
            classify_message("Error code 400 | Backend error. 400 Bad Request"),
            ErrorClass::RequestRejected
        );
        assert_eq!(
            classify_message("TRGBNBPD1: No data available for the requested date range | "),
            ErrorClass::NoData
        );
        assert_eq!(classify_message("Invalid RIC"), ErrorClass::Other);
    }

    #[test]
    fn no_data_message_names_the_instrument() {
        let err = ProviderError::from_message(
            Some("fallback"),
            "TRGBNBPD1: No data available for the requested date range | ",
        );
        assert_eq!(err.class(), ErrorClass::NoData);
        assert_eq!(
            err.to_string(),
            "TRGBNBPD1: No data available for the requested date range"
        );

        let err = ProviderError::from_message(
            Some("ZEEDA"),
            "No data available for the requested date range",
        );
        assert_eq!(
            err.to_string(),
            "ZEEDA: No data available for the requested date range"
        );
    }

    #[test]
    fn error_code_prefix_is_skipped_when_naming_the_instrument() {
        let err = ProviderError::from_message(
            None,
            "Error code 404 | TRGBNBPD1: No data available for the requested date range",
        );
        assert_eq!(
            err.to_string(),
            "TRGBNBPD1: No data available for the requested date range"
        );

        let err = ProviderError::from_message(
            Some("ZEEDA"),
            "Error code 404 | No data available for the requested date range",
        );
        assert_eq!(
            err.to_string(),
            "ZEEDA: No data available for the requested date range"
        );
    }

    #[test]
    fn http_statuses_are_classified() {
        assert_eq!(
            ProviderError::from_status(StatusCode::GATEWAY_TIMEOUT, "").class(),
            ErrorClass::UpstreamBusy
        );
        assert_eq!(
            ProviderError::from_status(StatusCode::BAD_REQUEST, "bad").class(),
            ErrorClass::RequestRejected
        );
        assert_eq!(
            ProviderError::from_status(StatusCode::INTERNAL_SERVER_ERROR, "boom").class(),
            ErrorClass::Other
        );
    }
}
