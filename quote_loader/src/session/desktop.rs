use std::process::{ExitStatus, Stdio};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;
use tracing::debug;

use crate::config::{PASSWORD_ENV, SessionConfig, USER_ENV};
use crate::providers::udf::UdfProvider;
use crate::session::{HostError, HostSession};

/// Drives the desktop terminal through configured helper commands and registers the
/// application key with the terminal's API proxy.
pub struct DesktopSession<'a> {
    config: SessionConfig,
    provider: &'a UdfProvider,
}

impl<'a> DesktopSession<'a> {
    pub fn new(config: SessionConfig, provider: &'a UdfProvider) -> Self {
        Self { config, provider }
    }
}

fn command_for(argv: &[String], what: &'static str) -> Result<(Command, String), HostError> {
    let (program, args) = argv.split_first().ok_or(HostError::NotConfigured(what))?;
    let mut command = Command::new(program);
    command.args(args).stdin(Stdio::null());
    Ok((command, argv.join(" ")))
}

async fn status_of(mut command: Command, shown: String) -> Result<ExitStatus, HostError> {
    debug!(command = %shown, "running helper");
    command
        .status()
        .await
        .map_err(|source| HostError::Command {
            command: shown,
            source,
        })
}

async fn run_checked(command: Command, shown: String) -> Result<(), HostError> {
    let status = status_of(command, shown.clone()).await?;
    if !status.success() {
        return Err(HostError::CommandFailed {
            command: shown,
            status: status.to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl HostSession for DesktopSession<'_> {
    async fn launch(&self) -> Result<(), HostError> {
        let (mut command, shown) = command_for(&self.config.launch_command, "launch command")?;
        // The terminal keeps running after this process exits.
        command
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|source| HostError::Command {
                command: shown,
                source,
            })?;
        Ok(())
    }

    async fn submit_credentials(
        &self,
        user: &str,
        password: &SecretString,
    ) -> Result<(), HostError> {
        let (mut command, shown) = command_for(&self.config.login_command, "login command")?;
        command
            .env(USER_ENV, user)
            .env(PASSWORD_ENV, password.expose_secret());
        run_checked(command, shown).await
    }

    async fn auth_prompt_visible(&self) -> Result<bool, HostError> {
        let (command, shown) =
            command_for(&self.config.prompt_check_command, "prompt check command")?;
        Ok(status_of(command, shown).await?.success())
    }

    async fn confirm_forced_login(&self) -> Result<(), HostError> {
        let (command, shown) = command_for(&self.config.confirm_command, "confirm command")?;
        run_checked(command, shown).await
    }

    async fn register_key(&self, key: &SecretString) -> Result<(), HostError> {
        self.provider.register_app_key(key.clone()).await?;
        Ok(())
    }

    async fn terminate(&self) -> Result<(), HostError> {
        let (command, shown) = command_for(&self.config.terminate_command, "terminate command")?;
        run_checked(command, shown).await
    }
}
