//! Connection lifecycle to the quote source.
//!
//! `Idle -> Launching -> AwaitingAuth -> Authenticated -> Connected -> Closed`. When
//! no sign-in prompt shows up, `Launching` goes straight to `Authenticated`; in
//! data-only mode the session connects directly from `Idle`.
//!
//! Everything that touches the desktop terminal goes through [`HostSession`]; the
//! manager only sequences calls, waits, and decides when a failure is fatal. Fatal
//! failures are reported through the [`ReportDispatcher`] before they are returned.

pub mod desktop;

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use secrecy::SecretString;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{Credentials, SessionConfig};
use crate::dispatch::{MailSubjects, ReportDispatcher};
use crate::providers::ProviderError;
use crate::utils::pause::Pause;

pub use desktop::DesktopSession;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Launching,
    AwaitingAuth,
    Authenticated,
    Connected,
    Closed,
}

impl SessionState {
    fn can_move_to(self, next: Self) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Idle, Launching)
                | (Launching, AwaitingAuth)
                | (Launching, Authenticated)
                | (AwaitingAuth, Authenticated)
                | (Authenticated, Connected)
                | (Idle, Connected)
                | (Idle | Launching | AwaitingAuth | Authenticated | Connected, Closed)
        )
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Whether the terminal is started and stopped by this process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionMode {
    /// Launch, sign in, connect, and terminate at the end.
    Full,
    /// The terminal is already running; only register the key.
    DataOnly,
}

/// Failures of a single host operation.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("Failed to run {command}: {source}")]
    Command {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: String },

    #[error("No {0} configured")]
    NotConfigured(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid session transition from {from} to {to}")]
    InvalidTransition { from: SessionState, to: SessionState },

    #[error("Failed to launch the terminal: {0}")]
    Launch(#[source] HostError),

    #[error("Unable to sign in to the terminal, analysis required")]
    LoginFailed,

    #[error("Terminal credentials are required to sign in")]
    MissingCredentials,

    #[error("API proxy still unreachable after retry: {0}")]
    Connect(#[source] HostError),
}

/// The desktop side of a session.
#[async_trait]
pub trait HostSession: Send + Sync {
    async fn launch(&self) -> Result<(), HostError>;

    async fn submit_credentials(
        &self,
        user: &str,
        password: &SecretString,
    ) -> Result<(), HostError>;

    async fn auth_prompt_visible(&self) -> Result<bool, HostError>;

    async fn confirm_forced_login(&self) -> Result<(), HostError>;

    async fn register_key(&self, key: &SecretString) -> Result<(), HostError>;

    async fn terminate(&self) -> Result<(), HostError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionTimings {
    /// Dwell after launch and after each sign-in step.
    pub login_wait: Duration,
    /// Dwell for the application to load, and before the key registration retry.
    pub app_wait: Duration,
}

impl From<&SessionConfig> for SessionTimings {
    fn from(config: &SessionConfig) -> Self {
        Self {
            login_wait: Duration::from_secs(config.login_wait_secs),
            app_wait: Duration::from_secs(config.app_wait_secs),
        }
    }
}

pub struct SessionManager<'a> {
    host: &'a dyn HostSession,
    pause: &'a dyn Pause,
    dispatcher: &'a dyn ReportDispatcher,
    credentials: Option<Credentials>,
    app_key: SecretString,
    timings: SessionTimings,
    mode: SessionMode,
    state: SessionState,
}

impl<'a> SessionManager<'a> {
    pub fn new(
        host: &'a dyn HostSession,
        pause: &'a dyn Pause,
        dispatcher: &'a dyn ReportDispatcher,
        credentials: Option<Credentials>,
        app_key: SecretString,
        timings: SessionTimings,
        mode: SessionMode,
    ) -> Self {
        Self {
            host,
            pause,
            dispatcher,
            credentials,
            app_key,
            timings,
            mode,
            state: SessionState::Idle,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn mode(&self) -> SessionMode {
        self.mode
    }

    fn transition(&mut self, to: SessionState) -> Result<(), SessionError> {
        if !self.state.can_move_to(to) {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to,
            });
        }
        info!(from = %self.state, %to, "session transition");
        self.state = to;
        Ok(())
    }

    /// Brings the session to `Connected`, launching and signing in first unless in
    /// data-only mode.
    pub async fn open(&mut self) -> Result<(), SessionError> {
        if self.mode == SessionMode::Full {
            if let Err(err) = self.launch().await {
                let subject = match &err {
                    SessionError::LoginFailed => MailSubjects::LOGIN_FAILED,
                    _ => MailSubjects::LAUNCH_FAILED,
                };
                self.report(subject, &err).await;
                return Err(err);
            }
        }
        if let Err(err) = self.connect().await {
            self.report(MailSubjects::CONNECT_FAILED, &err).await;
            return Err(err);
        }
        Ok(())
    }

    /// `Idle -> Launching -> (AwaitingAuth ->) Authenticated`, then the app dwell.
    pub async fn launch(&mut self) -> Result<(), SessionError> {
        self.transition(SessionState::Launching)?;
        info!("launching the terminal");
        self.host.launch().await.map_err(SessionError::Launch)?;
        self.pause.pause(self.timings.login_wait).await;

        if !self.prompt_visible().await? {
            warn!("sign-in prompt did not appear, already signed in?");
        } else {
            self.transition(SessionState::AwaitingAuth)?;
            let credentials = self
                .credentials
                .as_ref()
                .ok_or(SessionError::MissingCredentials)?;
            self.host
                .submit_credentials(&credentials.user, &credentials.password)
                .await
                .map_err(SessionError::Launch)?;
            self.pause.pause(self.timings.login_wait).await;

            if self.prompt_visible().await? {
                info!("forced sign-in confirmation requested, confirming");
                self.host
                    .confirm_forced_login()
                    .await
                    .map_err(SessionError::Launch)?;
                self.pause.pause(self.timings.login_wait).await;

                if self.prompt_visible().await? {
                    error!("sign-in prompt is still visible after confirmation");
                    return Err(SessionError::LoginFailed);
                }
            }
            info!("signed in");
        }

        self.transition(SessionState::Authenticated)?;
        info!("waiting for the terminal to load");
        self.pause.pause(self.timings.app_wait).await;
        Ok(())
    }

    async fn prompt_visible(&self) -> Result<bool, SessionError> {
        self.host
            .auth_prompt_visible()
            .await
            .map_err(SessionError::Launch)
    }

    /// Registers the application key, retrying once after the app dwell.
    pub async fn connect(&mut self) -> Result<(), SessionError> {
        let ready = matches!(
            (self.mode, self.state),
            (SessionMode::Full, SessionState::Authenticated)
                | (SessionMode::DataOnly, SessionState::Idle)
        );
        if !ready {
            return Err(SessionError::InvalidTransition {
                from: self.state,
                to: SessionState::Connected,
            });
        }

        info!("connecting to the API proxy");
        if let Err(err) = self.host.register_key(&self.app_key).await {
            warn!(
                error = %err,
                retry_in_secs = self.timings.app_wait.as_secs(),
                "API proxy not reachable, retrying once"
            );
            self.pause.pause(self.timings.app_wait).await;
            self.host
                .register_key(&self.app_key)
                .await
                .map_err(SessionError::Connect)?;
        }

        self.transition(SessionState::Connected)?;
        info!("connected");
        Ok(())
    }

    /// Forcefully stops the terminal in full mode. Never fails; problems are logged.
    pub async fn close(&mut self) {
        if self.state == SessionState::Closed {
            return;
        }
        if self.mode == SessionMode::Full {
            info!("terminating the terminal");
            if let Err(err) = self.host.terminate().await {
                warn!(error = %err, "failed to terminate the terminal");
            }
        }
        if let Err(err) = self.transition(SessionState::Closed) {
            warn!(error = %err, "session close out of order");
        }
    }

    async fn report(&self, subject: &str, err: &SessionError) {
        error!(subject, error = %err, "session failure");
        let message = format!("{subject}.\nError: {err}");
        if let Err(dispatch_err) = self.dispatcher.notify(None, subject, &[message]).await {
            error!(error = %dispatch_err, "failed to dispatch session failure report");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transition_graph_matches_lifecycle() {
        use SessionState::*;
        assert!(Idle.can_move_to(Launching));
        assert!(Launching.can_move_to(Authenticated));
        assert!(AwaitingAuth.can_move_to(Authenticated));
        assert!(Idle.can_move_to(Connected));
        assert!(Connected.can_move_to(Closed));

        assert!(!Idle.can_move_to(AwaitingAuth));
        assert!(!Launching.can_move_to(Connected));
        assert!(!Closed.can_move_to(Idle));
        assert!(!Closed.can_move_to(Closed));
        assert!(!Connected.can_move_to(Launching));
    }
}
