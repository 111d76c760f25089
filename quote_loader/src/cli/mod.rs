//! Command line entry point.

pub mod commands;
pub mod params;

use chrono::Local;
use tracing::info;

use crate::cli::commands::Cli;
use crate::cli::params::run_params;
use crate::config::LoaderConfig;
use crate::runner::{RunError, execute};

/// Resolves configuration and parameters, then runs one invocation.
pub async fn run(cli: Cli) -> Result<(), RunError> {
    let params = run_params(&cli, Local::now().date_naive())?;
    let config = LoaderConfig::load(cli.config.as_deref())?;

    if cli.debug {
        info!(log_path = %cli.log_path.display(), "log directory");
        info!(manage_terminal = !cli.get, "launch and terminate the terminal");
        info!(fx = cli.fx_enabled(), gas = cli.gas_enabled(), "classes");
        info!(start = %params.range.start(), end = %params.range.end(), "load window");
        info!(
            retry = params.retry,
            retry_delay_secs = params.retry_delay.as_secs(),
            type_delay_secs = params.type_delay.as_secs(),
            ric_delay_secs = params.instrument_delay.as_secs(),
            "pacing"
        );
    }

    let results = execute(&config, &params).await?;
    let with_artifact = results.iter().filter(|r| r.artifact_path.is_some()).count();
    let errors: usize = results.iter().map(|r| r.errors.len()).sum();
    info!(
        batches = results.len(),
        artifacts = with_artifact,
        errors,
        "load complete"
    );
    Ok(())
}
