//! One pass over the catalog for a single (class, chunk) pair.

use std::time::Duration;

use tracing::{error, info, warn};

use crate::catalog::Catalog;
use crate::dispatch::{MailSubjects, ReportDispatcher};
use crate::errors::Error;
use crate::fetchers::fetcher_for;
use crate::io::sink::ArtifactSink;
use crate::models::batch_result::BatchResult;
use crate::models::date_range::DateRange;
use crate::models::instrument::InstrumentClass;
use crate::providers::QuoteProvider;
use crate::retry::RetryPolicy;
use crate::utils::pause::Pause;

/// Collaborators and pacing shared by every collector run of an invocation.
pub struct BatchCollector<'a> {
    catalog: &'a Catalog,
    provider: &'a dyn QuoteProvider,
    sink: &'a dyn ArtifactSink,
    dispatcher: &'a dyn ReportDispatcher,
    pause: &'a dyn Pause,
    retry: RetryPolicy,
    instrument_delay: Duration,
}

impl<'a> BatchCollector<'a> {
    pub fn new(
        catalog: &'a Catalog,
        provider: &'a dyn QuoteProvider,
        sink: &'a dyn ArtifactSink,
        dispatcher: &'a dyn ReportDispatcher,
        pause: &'a dyn Pause,
        retry: RetryPolicy,
        instrument_delay: Duration,
    ) -> Self {
        Self {
            catalog,
            provider,
            sink,
            dispatcher,
            pause,
            retry,
            instrument_delay,
        }
    }

    /// Fetches every `class` instrument over `range`, writes the artifact when any
    /// rows came back, and dispatches exactly once.
    ///
    /// Per-instrument failures end up in [`BatchResult::errors`]. Only sink and
    /// dispatch failures are returned as errors.
    pub async fn run(
        &self,
        class: InstrumentClass,
        range: DateRange,
    ) -> Result<BatchResult, Error> {
        let label = range.label();
        info!(%class, range = %label, "collecting {}", class.display_name());

        let mut result = BatchResult::new(class, range);
        let fetcher = fetcher_for(class);
        let fetcher = fetcher.as_ref();
        let provider = self.provider;
        let range_ref = &range;

        for instrument in self.catalog.instruments_of(class) {
            self.pause.pause(self.instrument_delay).await;

            let attempt = self
                .retry
                .attempt(&instrument.id, self.pause, move || {
                    fetcher.fetch(provider, instrument, range_ref)
                })
                .await;

            if let Some(entry) = attempt.error_entry(&instrument.id) {
                result.errors.push(entry);
            }
            if let Some(rows) = attempt.into_success() {
                info!(instrument = %instrument.id, rows = rows.len(), "instrument collected");
                result.rows.extend(rows);
            }
        }

        let subject = MailSubjects::for_class(class, &label);

        if result.has_rows() {
            result.rows.sort_by(|a, b| a.key().cmp(&b.key()));
            match self.sink.write(class, &range, &result.rows).await {
                Ok(path) => result.artifact_path = Some(path),
                Err(err) => {
                    // The collected errors still go out; the write failure is appended.
                    error!(%class, range = %label, error = %err, "failed to write artifact");
                    let mut errors = std::mem::take(&mut result.errors);
                    errors.push(format!("failed to write artifact: {err}"));
                    if let Err(dispatch_err) = self.dispatcher.notify(None, &subject, &errors).await
                    {
                        error!(error = %dispatch_err, "failed to dispatch batch errors");
                    }
                    return Err(err.into());
                }
            }
        } else {
            warn!(%class, range = %label, "no rows collected, no artifact written");
        }

        self.dispatcher
            .notify(result.artifact_path.as_deref(), &subject, &result.errors)
            .await?;

        info!(
            %class,
            range = %label,
            rows = result.rows.len(),
            errors = result.errors.len(),
            "batch finished"
        );
        Ok(result)
    }
}
