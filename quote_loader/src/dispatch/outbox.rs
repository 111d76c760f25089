use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::Local;
use serde::{Deserialize, Serialize};
use shared_utils::env::get_env_var;
use tracing::{info, warn};

use crate::config::{DATA_RECIPIENT_ENV, DispatchConfig, ERROR_RECIPIENT_ENV};
use crate::dispatch::{DispatchError, MailSubjects, ReportDispatcher};

const DATA_BODY: &str = "Data attached.";
const NO_DATA_BODY: &str = "No data found.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Data,
    /// Nothing came back for the chunk and nothing failed.
    NoData,
    Errors,
}

/// One message for the external mailer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub to: Vec<String>,
    pub subject: String,
    pub body: String,
    /// File name of the artifact, placed next to the notification.
    pub attachment: Option<String>,
    pub created_at: String,
}

/// Drops notifications as JSON files into an outbox directory.
#[derive(Debug)]
pub struct OutboxDispatcher {
    outbox: PathBuf,
    data_recipients: Vec<String>,
    error_recipients: Vec<String>,
    sequence: AtomicU64,
}

impl OutboxDispatcher {
    /// Recipients are comma separated lists.
    pub fn new(
        outbox: impl Into<PathBuf>,
        data_recipients: &str,
        error_recipients: &str,
    ) -> Self {
        Self {
            outbox: outbox.into(),
            data_recipients: split_recipients(data_recipients),
            error_recipients: split_recipients(error_recipients),
            sequence: AtomicU64::new(0),
        }
    }

    /// Recipients from `QUOTE_DATA_RECIPIENT` / `QUOTE_ERROR_RECIPIENT`.
    pub fn from_env(config: &DispatchConfig) -> Result<Self, DispatchError> {
        let data = get_env_var(DATA_RECIPIENT_ENV)?;
        let errors = get_env_var(ERROR_RECIPIENT_ENV)?;
        Ok(Self::new(&config.outbox, &data, &errors))
    }

    fn ensure_outbox(&self) -> Result<(), DispatchError> {
        fs::create_dir_all(&self.outbox).map_err(|source| DispatchError::Io {
            path: self.outbox.clone(),
            source,
        })
    }

    /// Moves the artifact into the outbox and returns its file name.
    fn stage_artifact(&self, artifact: &Path) -> Result<String, DispatchError> {
        let name = artifact
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "artifact.csv".to_string());
        let target = self.outbox.join(&name);
        let io_err = |source| DispatchError::Io {
            path: target.clone(),
            source,
        };

        if fs::rename(artifact, &target).is_err() {
            // rename fails across file systems
            fs::copy(artifact, &target).map_err(io_err)?;
            fs::remove_file(artifact).map_err(io_err)?;
        }
        Ok(name)
    }

    fn write(&self, notification: &Notification) -> Result<PathBuf, DispatchError> {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let kind = match notification.kind {
            NotificationKind::Data => "data",
            NotificationKind::NoData => "nodata",
            NotificationKind::Errors => "errors",
        };
        let stamp = Local::now().format("%Y%m%dT%H%M%S%3f");
        let path = self.outbox.join(format!("{stamp}_{seq:04}_{kind}.json"));

        let json = serde_json::to_vec_pretty(notification)?;
        fs::write(&path, json).map_err(|source| DispatchError::Io {
            path: path.clone(),
            source,
        })?;
        Ok(path)
    }
}

#[async_trait]
impl ReportDispatcher for OutboxDispatcher {
    async fn notify(
        &self,
        artifact: Option<&Path>,
        subject: &str,
        errors: &[String],
    ) -> Result<(), DispatchError> {
        self.ensure_outbox()?;
        let created_at = Local::now().to_rfc3339();

        match artifact {
            Some(artifact) => {
                let attachment = self.stage_artifact(artifact)?;
                let path = self.write(&Notification {
                    kind: NotificationKind::Data,
                    to: self.data_recipients.clone(),
                    subject: subject.to_string(),
                    body: DATA_BODY.to_string(),
                    attachment: Some(attachment),
                    created_at: created_at.clone(),
                })?;
                info!(subject, path = %path.display(), "data notification queued");
            }
            None if errors.is_empty() => {
                warn!(subject, "no artifact and no errors");
                let path = self.write(&Notification {
                    kind: NotificationKind::NoData,
                    to: self.data_recipients.clone(),
                    subject: subject.to_string(),
                    body: NO_DATA_BODY.to_string(),
                    attachment: None,
                    created_at,
                })?;
                info!(subject, path = %path.display(), "no-data notification queued");
                return Ok(());
            }
            None => {}
        }

        if !errors.is_empty() {
            let path = self.write(&Notification {
                kind: NotificationKind::Errors,
                to: self.error_recipients.clone(),
                subject: MailSubjects::errors_for(subject),
                body: format!(
                    "The following errors occurred while loading and sending data:\n{}",
                    errors.join("\n")
                ),
                attachment: None,
                created_at,
            })?;
            info!(
                subject,
                errors = errors.len(),
                path = %path.display(),
                "error notification queued"
            );
        }
        Ok(())
    }
}

fn split_recipients(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
        .collect()
}
