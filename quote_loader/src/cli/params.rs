use std::time::Duration;

use chrono::{Days, NaiveDate};

use crate::cli::commands::Cli;
use crate::models::date_range::DateRange;
use crate::models::instrument::InstrumentClass;
use crate::runner::{RunError, RunParams};
use crate::session::SessionMode;

/// Load window from the command line.
///
/// `backoff` wins over explicit dates. Otherwise the start date is required and the
/// end date defaults to it.
pub fn resolve_range(
    backoff: Option<u32>,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
    today: NaiveDate,
) -> Result<DateRange, RunError> {
    if let Some(days) = backoff {
        let day = today
            .checked_sub_days(Days::new(u64::from(days)))
            .ok_or_else(|| RunError::Usage(format!("backoff of {days} days is out of range")))?;
        return Ok(DateRange::single_day(day));
    }

    let start = start.ok_or_else(|| RunError::Usage("the start date must be given".into()))?;
    let end = end.unwrap_or(start);
    DateRange::new(start, end).map_err(|e| RunError::Usage(e.to_string()))
}

/// Classes in processing order: FX first, then gas.
pub fn resolve_classes(fx: bool, gas: bool) -> Result<Vec<InstrumentClass>, RunError> {
    let classes: Vec<InstrumentClass> = InstrumentClass::ALL
        .into_iter()
        .filter(|class| match class {
            InstrumentClass::Fx => fx,
            InstrumentClass::Gas => gas,
        })
        .collect();
    if classes.is_empty() {
        return Err(RunError::Usage(
            "nothing to load: both FX rates and gas prices are disabled".into(),
        ));
    }
    Ok(classes)
}

pub fn run_params(cli: &Cli, today: NaiveDate) -> Result<RunParams, RunError> {
    Ok(RunParams {
        range: resolve_range(cli.backoff, cli.date_start, cli.date_end, today)?,
        classes: resolve_classes(cli.fx_enabled(), cli.gas_enabled())?,
        mode: if cli.get {
            SessionMode::DataOnly
        } else {
            SessionMode::Full
        },
        retry: cli.retry,
        retry_delay: Duration::from_secs(cli.retry_delay),
        type_delay: Duration::from_secs(cli.type_delay),
        instrument_delay: Duration::from_secs(cli.ric_delay),
    })
}
