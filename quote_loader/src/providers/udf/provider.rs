use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, header};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use snafu::ResultExt;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::models::date_range::DateRange;
use crate::providers::udf::params::{
    DATA_GRID_DIRECTION, Envelope, TIME_SERIES_DIRECTION, construct_field_history,
    construct_metadata, construct_time_series,
};
use crate::providers::udf::response::{DataGridResponse, StatusResponse, TimeSeriesResponse};
use crate::providers::{
    FieldObservation, Frequency, MetadataRecord, NotConnectedSnafu, ProviderError, QuoteProvider,
    ReqwestSnafu, TimeSeries, TimeSeriesRequest,
};

const APP_KEY_HEADER: &str = "x-tr-applicationid";

pub struct UdfProvider {
    client: Client,
    base_url: String,
    app_key: RwLock<Option<SecretString>>,
}

impl UdfProvider {
    /// Creates a client for the proxy at `config.base_url`. No request is made until
    /// [`UdfProvider::register_app_key`] succeeds.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context(ReqwestSnafu)?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            app_key: RwLock::new(None),
        })
    }

    /// Checks that the proxy is up and remembers the key for subsequent requests.
    pub async fn register_app_key(&self, key: SecretString) -> Result<(), ProviderError> {
        let url = format!("{}/api/status", self.base_url);
        debug!(%url, "checking API proxy status");

        let response = self.client.get(&url).send().await.context(ReqwestSnafu)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status, &body));
        }
        let status: StatusResponse = response.json().await.context(ReqwestSnafu)?;
        if !status.is_ready() {
            return NotConnectedSnafu {
                message: format!("API proxy reports {}", status.status_code),
            }
            .fail();
        }

        let mut slot = self.app_key.write().map_err(|_| {
            NotConnectedSnafu {
                message: "application key slot poisoned",
            }
            .build()
        })?;
        *slot = Some(key);
        Ok(())
    }

    fn app_key(&self) -> Result<String, ProviderError> {
        let slot = self.app_key.read().map_err(|_| {
            NotConnectedSnafu {
                message: "application key slot poisoned",
            }
            .build()
        })?;
        slot.as_ref()
            .map(|key| key.expose_secret().to_string())
            .ok_or_else(|| {
                NotConnectedSnafu {
                    message: "no application key registered",
                }
                .build()
            })
    }

    async fn post<W, R>(&self, direction: &str, payload: W) -> Result<R, ProviderError>
    where
        W: Serialize + Send,
        R: DeserializeOwned,
    {
        let key = self.app_key()?;
        let url = format!("{}/api/v1/data", self.base_url);
        debug!(%url, direction, "sending data request");

        let response = self
            .client
            .post(&url)
            .header(APP_KEY_HEADER, key)
            .json(&Envelope::new(direction, payload))
            .send()
            .await
            .context(ReqwestSnafu)?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown API error".to_string());
            return Err(ProviderError::from_status(status, &body));
        }

        response.json::<R>().await.context(ReqwestSnafu)
    }
}

#[async_trait]
impl QuoteProvider for UdfProvider {
    async fn fetch_time_series(
        &self,
        request: &TimeSeriesRequest,
    ) -> Result<Vec<TimeSeries>, ProviderError> {
        let response: TimeSeriesResponse = self
            .post(TIME_SERIES_DIRECTION, construct_time_series(request))
            .await?;
        response.into_time_series()
    }

    async fn fetch_metadata(
        &self,
        instruments: &[String],
        fields: &[String],
    ) -> Result<Option<Vec<MetadataRecord>>, ProviderError> {
        let response: DataGridResponse = self
            .post(DATA_GRID_DIRECTION, construct_metadata(instruments, fields))
            .await?;
        response.into_metadata(fields)
    }

    async fn fetch_field_history(
        &self,
        instrument: &str,
        field: &str,
        range: &DateRange,
        frequency: Frequency,
    ) -> Result<Vec<FieldObservation>, ProviderError> {
        let response: DataGridResponse = self
            .post(
                DATA_GRID_DIRECTION,
                construct_field_history(instrument, field, range, frequency),
            )
            .await?;
        response.into_field_history(instrument, field)
    }
}
