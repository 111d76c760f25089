//! Top-level orchestration of one invocation.
//!
//! The session is opened once, every chunk is processed class by class, and the
//! session is closed once at the end (also when a chunk fails). A chunk failure is
//! reported with the load-failure subject and ends the invocation.

use std::time::Duration;

use thiserror::Error;
use tracing::{error, info};

use crate::catalog::{Catalog, resolve_catalog};
use crate::chunker::split;
use crate::collector::BatchCollector;
use crate::config::{ConfigError, Credentials, LoaderConfig, app_key_from_env};
use crate::dispatch::{DispatchError, MailSubjects, OutboxDispatcher, ReportDispatcher};
use crate::errors::Error;
use crate::io::sink::{ArtifactSink, CsvArtifactSink};
use crate::models::batch_result::BatchResult;
use crate::models::date_range::DateRange;
use crate::models::instrument::InstrumentClass;
use crate::providers::QuoteProvider;
use crate::providers::udf::UdfProvider;
use crate::retry::RetryPolicy;
use crate::session::{
    DesktopSession, SessionError, SessionManager, SessionMode, SessionTimings,
};
use crate::utils::pause::{Pause, TokioPause};

/// Date format used in human readable reports.
pub const REPORT_DATE_FORMAT: &str = "%d.%m.%Y";

/// Everything an invocation needs to know besides the configuration file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunParams {
    pub range: DateRange,
    /// In processing order.
    pub classes: Vec<InstrumentClass>,
    pub mode: SessionMode,
    /// Total attempts per instrument.
    pub retry: u32,
    pub retry_delay: Duration,
    /// Pause between two classes of the same chunk.
    pub type_delay: Duration,
    /// Pause before every instrument.
    pub instrument_delay: Duration,
}

#[derive(Debug, Error)]
pub enum RunError {
    #[error("Invalid arguments: {0}")]
    Usage(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    Orchestration(#[from] Error),
}

impl RunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Usage(_) => 2,
            Self::Session(_) => 3,
            Self::Orchestration(Error::Config(_) | Error::Catalog(_)) | Self::Config(_) => 5,
            Self::Orchestration(_) => 4,
        }
    }
}

/// Shared collaborators of the load phase.
pub struct Loader<'a> {
    pub catalog: &'a Catalog,
    pub provider: &'a dyn QuoteProvider,
    pub sink: &'a dyn ArtifactSink,
    pub dispatcher: &'a dyn ReportDispatcher,
    pub pause: &'a dyn Pause,
}

impl Loader<'_> {
    /// Opens the session, loads every chunk, and closes the session.
    pub async fn run(
        &self,
        session: &mut SessionManager<'_>,
        params: &RunParams,
    ) -> Result<Vec<BatchResult>, RunError> {
        session.open().await?;
        let outcome = self.load(params).await;
        session.close().await;
        Ok(outcome?)
    }

    /// Processes the chunks of `params.range` in order. Stops at the first chunk
    /// that fails, after reporting it.
    pub async fn load(&self, params: &RunParams) -> Result<Vec<BatchResult>, Error> {
        let collector = BatchCollector::new(
            self.catalog,
            self.provider,
            self.sink,
            self.dispatcher,
            self.pause,
            RetryPolicy::new(params.retry, params.retry_delay),
            params.instrument_delay,
        );

        let chunks = split(params.range);
        info!(range = %params.range, chunks = chunks.len(), "starting load");

        let mut results = Vec::with_capacity(chunks.len() * params.classes.len());
        for chunk in chunks {
            for (i, class) in params.classes.iter().enumerate() {
                if i > 0 {
                    self.pause.pause(params.type_delay).await;
                }
                match collector.run(*class, chunk.range()).await {
                    Ok(result) => results.push(result),
                    Err(err) => {
                        self.report_failure(chunk.range(), &err).await;
                        return Err(err);
                    }
                }
            }
        }
        Ok(results)
    }

    async fn report_failure(&self, range: DateRange, err: &Error) {
        let message = format!(
            "{}.\nStart date: {} End date: {}.\nError: {err}",
            MailSubjects::LOAD_FAILED,
            range.start().format(REPORT_DATE_FORMAT),
            range.end().format(REPORT_DATE_FORMAT),
        );
        error!(range = %range, error = %err, "load failed");
        if let Err(dispatch_err) = self
            .dispatcher
            .notify(None, MailSubjects::LOAD_FAILED, &[message])
            .await
        {
            error!(error = %dispatch_err, "failed to dispatch load failure report");
        }
    }
}

/// Wires the production collaborators from `config` and the environment and runs.
pub async fn execute(
    config: &LoaderConfig,
    params: &RunParams,
) -> Result<Vec<BatchResult>, RunError> {
    let catalog = resolve_catalog(config.catalog.as_deref()).map_err(Error::Catalog)?;
    info!(instruments = catalog.len(), "catalog loaded");

    let dispatcher = OutboxDispatcher::from_env(&config.dispatch).map_err(|err| match err {
        DispatchError::MissingRecipient(missing) => RunError::Config(missing.into()),
        other => RunError::Orchestration(other.into()),
    })?;
    let app_key = app_key_from_env()?;
    let credentials = match params.mode {
        SessionMode::Full => Some(Credentials::from_env()?),
        SessionMode::DataOnly => None,
    };

    let provider = UdfProvider::new(&config.provider).map_err(Error::from)?;
    let host = DesktopSession::new(config.session.clone(), &provider);
    let sink = CsvArtifactSink::new(config.output.clone());
    let pause = TokioPause;

    let mut session = SessionManager::new(
        &host,
        &pause,
        &dispatcher,
        credentials,
        app_key,
        SessionTimings::from(&config.session),
        params.mode,
    );

    let loader = Loader {
        catalog: &catalog,
        provider: &provider,
        sink: &sink,
        dispatcher: &dispatcher,
        pause: &pause,
    };
    loader.run(&mut session, params).await
}
