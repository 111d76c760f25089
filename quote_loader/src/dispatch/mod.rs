//! Hand-off of artifacts and diagnostics to whoever informs the humans.
//!
//! The loader calls [`ReportDispatcher::notify`] exactly once per (class, chunk) run
//! and once per fatal error. What happens next (mail, chat, a file drop) is up to the
//! implementation; [`OutboxDispatcher`] leaves JSON notifications for an external
//! mailer.

pub mod outbox;

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use shared_utils::env::MissingEnvVarError;
use thiserror::Error;

use crate::models::instrument::InstrumentClass;

pub use outbox::OutboxDispatcher;

/// Notification subjects.
pub struct MailSubjects;

impl MailSubjects {
    pub const LAUNCH_FAILED: &'static str = "Unexpected error while launching the terminal";
    pub const CONNECT_FAILED: &'static str = "Unexpected error while connecting to the API proxy";
    pub const LOAD_FAILED: &'static str = "Unexpected error while retrieving and sending data";
    pub const LOGIN_FAILED: &'static str = "Data retrieval from the terminal";

    pub fn fx_rates(label: &str) -> String {
        format!("FX rates for {label}")
    }

    pub fn gas_prices(label: &str) -> String {
        format!("Gas prices for {label}")
    }

    pub fn for_class(class: InstrumentClass, label: &str) -> String {
        match class {
            InstrumentClass::Fx => Self::fx_rates(label),
            InstrumentClass::Gas => Self::gas_prices(label),
        }
    }

    /// Subject of the error message that accompanies `subject`.
    pub fn errors_for(subject: &str) -> String {
        format!("Errors while preparing \"{subject}\"")
    }
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to write notification {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to serialize notification: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error(transparent)]
    MissingRecipient(#[from] MissingEnvVarError),
}

#[async_trait]
pub trait ReportDispatcher: Send + Sync {
    /// `artifact == None` means no data was found; with empty `errors` that is a
    /// plain no-data notice under `subject`, not an error report. `errors` are
    /// joined with newlines in the outgoing message.
    async fn notify(
        &self,
        artifact: Option<&Path>,
        subject: &str,
        errors: &[String],
    ) -> Result<(), DispatchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_subjects_carry_the_label() {
        assert_eq!(
            MailSubjects::for_class(InstrumentClass::Fx, "2024-01-01"),
            "FX rates for 2024-01-01"
        );
        assert_eq!(
            MailSubjects::for_class(InstrumentClass::Gas, "2024-01-01 - 2024-01-31"),
            "Gas prices for 2024-01-01 - 2024-01-31"
        );
    }
}
