use thiserror::Error;

use crate::config::ConfigError;
use crate::dispatch::DispatchError;
use crate::io::sink::SinkError;
use crate::providers::ProviderError;

/// The unified error type for the `quote_loader` crate.
#[derive(Debug, Error)]
pub enum Error {
    /// An error originating from the quote provider that escaped the retry policy.
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// An error originating from the artifact sink (e.g., file I/O, CSV encoding).
    #[error("Sink error: {0}")]
    Sink(#[from] SinkError),

    /// The notification could not be handed over.
    #[error("Dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    /// An error related to configuration.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The instrument catalog could not be loaded.
    #[error("Catalog error: {0:#}")]
    Catalog(anyhow::Error),
}
