#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use indexmap::IndexMap;
use quote_loader::dispatch::{DispatchError, ReportDispatcher};
use quote_loader::fetchers::{CLOSE, HIGH, LOW, OPEN};
use quote_loader::fetchers::gas::{CURRENCY_FIELD, UNIT_FIELD, VOLUME_FIELD};
use quote_loader::io::sink::{ArtifactSink, SinkError, WriteSnafu};
use quote_loader::models::date_range::DateRange;
use quote_loader::models::instrument::InstrumentClass;
use quote_loader::models::quote_row::QuoteRow;
use quote_loader::providers::{
    ApiSnafu, FieldObservation, Frequency, MetadataRecord, NoDataSnafu, NotConnectedSnafu,
    ProviderError, QuoteProvider, RejectedSnafu, TimeSeries, TimeSeriesPoint, TimeSeriesRequest,
    UpstreamBusySnafu,
};
use quote_loader::session::{HostError, HostSession};
use quote_loader::utils::pause::Pause;
use secrecy::SecretString;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// A complete OHLC point; `close` doubles as a marker in assertions.
pub fn ohlc_point(date: NaiveDate, close: f64) -> TimeSeriesPoint {
    let mut values = IndexMap::new();
    values.insert(HIGH.to_string(), Some(close + 0.5));
    values.insert(LOW.to_string(), Some(close - 0.5));
    values.insert(OPEN.to_string(), Some(close - 0.1));
    values.insert(CLOSE.to_string(), Some(close));
    TimeSeriesPoint { date, values }
}

pub fn with_volume(mut point: TimeSeriesPoint, volume: Option<f64>) -> TimeSeriesPoint {
    point.values.insert(VOLUME_FIELD.to_string(), volume);
    point
}

pub fn without(mut point: TimeSeriesPoint, field: &str) -> TimeSeriesPoint {
    point.values.insert(field.to_string(), None);
    point
}

/// Scripted answer to a time-series request.
#[derive(Debug, Clone)]
pub enum Reply {
    Points(Vec<TimeSeriesPoint>),
    Busy,
    NoData,
    Rejected,
    Fail(&'static str),
}

impl Reply {
    fn into_result(self, instrument: &str) -> Result<Vec<TimeSeries>, ProviderError> {
        match self {
            Reply::Points(points) => Ok(vec![TimeSeries {
                instrument: instrument.to_string(),
                points,
            }]),
            Reply::Busy => UpstreamBusySnafu {
                message: "UDF Core request failed. Gateway Time-out",
            }
            .fail(),
            Reply::NoData => NoDataSnafu { instrument }.fail(),
            Reply::Rejected => RejectedSnafu {
                message: "Error code 400 | Backend error. 400 Bad Request",
            }
            .fail(),
            Reply::Fail(message) => ApiSnafu { message }.fail(),
        }
    }
}

/// Provider fake keyed by instrument id. Unknown instruments have no data. The last
/// scripted time-series reply of an instrument repeats.
#[derive(Default)]
pub struct FakeProvider {
    series: Mutex<HashMap<String, VecDeque<Reply>>>,
    metadata: HashMap<String, (Option<String>, Option<String>)>,
    history: HashMap<(String, String), Vec<FieldObservation>>,
    failing_history: HashMap<(String, String), &'static str>,
    pub requests: Mutex<Vec<TimeSeriesRequest>>,
    pub history_calls: Mutex<Vec<(String, String)>>,
    pub metadata_calls: Mutex<Vec<Vec<String>>>,
}

impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(self, id: &str, replies: Vec<Reply>) -> Self {
        self.series
            .lock()
            .unwrap()
            .insert(id.to_string(), replies.into_iter().collect());
        self
    }

    pub fn metadata(mut self, id: &str, currency: Option<&str>, unit: Option<&str>) -> Self {
        self.metadata.insert(
            id.to_string(),
            (currency.map(str::to_string), unit.map(str::to_string)),
        );
        self
    }

    pub fn history(mut self, id: &str, field: &str, observations: Vec<FieldObservation>) -> Self {
        self.history
            .insert((id.to_string(), field.to_string()), observations);
        self
    }

    pub fn failing_history(mut self, id: &str, field: &str, message: &'static str) -> Self {
        self.failing_history
            .insert((id.to_string(), field.to_string()), message);
        self
    }

    pub fn series_calls(&self, id: &str) -> usize {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.instruments.iter().any(|i| i == id))
            .count()
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    async fn fetch_time_series(
        &self,
        request: &TimeSeriesRequest,
    ) -> Result<Vec<TimeSeries>, ProviderError> {
        self.requests.lock().unwrap().push(request.clone());
        let id = request.instruments[0].clone();

        let reply = {
            let mut series = self.series.lock().unwrap();
            match series.get_mut(&id) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        reply.unwrap_or(Reply::NoData).into_result(&id)
    }

    async fn fetch_metadata(
        &self,
        instruments: &[String],
        fields: &[String],
    ) -> Result<Option<Vec<MetadataRecord>>, ProviderError> {
        self.metadata_calls.lock().unwrap().push(instruments.to_vec());
        let records: Vec<MetadataRecord> = instruments
            .iter()
            .filter_map(|id| {
                let (currency, unit) = self.metadata.get(id)?;
                let mut values = IndexMap::new();
                for field in fields {
                    let value = match field.as_str() {
                        CURRENCY_FIELD => currency.clone(),
                        UNIT_FIELD => unit.clone(),
                        _ => None,
                    };
                    values.insert(field.clone(), value);
                }
                Some(MetadataRecord {
                    instrument: id.clone(),
                    values,
                })
            })
            .collect();
        Ok((!records.is_empty()).then_some(records))
    }

    async fn fetch_field_history(
        &self,
        instrument: &str,
        field: &str,
        _range: &DateRange,
        _frequency: Frequency,
    ) -> Result<Vec<FieldObservation>, ProviderError> {
        let key = (instrument.to_string(), field.to_string());
        self.history_calls.lock().unwrap().push(key.clone());
        if let Some(message) = self.failing_history.get(&key) {
            return ApiSnafu {
                message: *message,
            }
            .fail();
        }
        Ok(self.history.get(&key).cloned().unwrap_or_default())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Dispatched {
    pub artifact: Option<PathBuf>,
    pub subject: String,
    pub errors: Vec<String>,
}

/// Records every notification.
#[derive(Default)]
pub struct RecordingDispatcher {
    pub calls: Mutex<Vec<Dispatched>>,
}

impl RecordingDispatcher {
    pub fn calls(&self) -> Vec<Dispatched> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl ReportDispatcher for RecordingDispatcher {
    async fn notify(
        &self,
        artifact: Option<&Path>,
        subject: &str,
        errors: &[String],
    ) -> Result<(), DispatchError> {
        self.calls.lock().unwrap().push(Dispatched {
            artifact: artifact.map(Path::to_path_buf),
            subject: subject.to_string(),
            errors: errors.to_vec(),
        });
        Ok(())
    }
}

/// Sink whose disk is always full.
pub struct FailingSink;

#[async_trait]
impl ArtifactSink for FailingSink {
    async fn write(
        &self,
        _class: InstrumentClass,
        _range: &DateRange,
        _rows: &[QuoteRow],
    ) -> Result<PathBuf, SinkError> {
        WriteSnafu {
            message: "No space left on device",
        }
        .fail()
    }
}

#[derive(Default)]
pub struct RecordingPause {
    pub waits: Mutex<Vec<Duration>>,
}

impl RecordingPause {
    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().unwrap().clone()
    }

    pub fn count_of(&self, duration: Duration) -> usize {
        self.waits().iter().filter(|d| **d == duration).count()
    }
}

#[async_trait]
impl Pause for RecordingPause {
    async fn pause(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
    }
}

/// Host fake. `prompt` holds the successive answers of the prompt check (then
/// `false`); the first `key_failures` registrations fail.
#[derive(Default)]
pub struct FakeHost {
    pub prompt: Mutex<VecDeque<bool>>,
    pub key_failures: Mutex<u32>,
    pub fail_launch: bool,
    pub fail_terminate: bool,
    pub calls: Mutex<Vec<&'static str>>,
}

impl FakeHost {
    pub fn new(prompt: &[bool], key_failures: u32) -> Self {
        Self {
            prompt: Mutex::new(prompt.iter().copied().collect()),
            key_failures: Mutex::new(key_failures),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: &'static str) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl HostSession for FakeHost {
    async fn launch(&self) -> Result<(), HostError> {
        self.record("launch");
        if self.fail_launch {
            return Err(HostError::NotConfigured("launch command"));
        }
        Ok(())
    }

    async fn submit_credentials(
        &self,
        _user: &str,
        _password: &SecretString,
    ) -> Result<(), HostError> {
        self.record("submit_credentials");
        Ok(())
    }

    async fn auth_prompt_visible(&self) -> Result<bool, HostError> {
        self.record("auth_prompt_visible");
        Ok(self.prompt.lock().unwrap().pop_front().unwrap_or(false))
    }

    async fn confirm_forced_login(&self) -> Result<(), HostError> {
        self.record("confirm_forced_login");
        Ok(())
    }

    async fn register_key(&self, _key: &SecretString) -> Result<(), HostError> {
        self.record("register_key");
        let mut failures = self.key_failures.lock().unwrap();
        if *failures > 0 {
            *failures -= 1;
            return Err(HostError::Provider(
                NotConnectedSnafu {
                    message: "API proxy reports ST_PROXY_NOT_READY",
                }
                .build(),
            ));
        }
        Ok(())
    }

    async fn terminate(&self) -> Result<(), HostError> {
        self.record("terminate");
        if self.fail_terminate {
            return Err(HostError::CommandFailed {
                command: "taskkill /f /im Eikon.exe".into(),
                status: "exit status: 128".into(),
            });
        }
        Ok(())
    }
}
