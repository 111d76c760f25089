//! Runtime configuration.
//!
//! Non-secret settings live in a TOML file (`quote_loader.toml` by default); every
//! section is optional and falls back to the defaults below. Credentials and mail
//! recipients are read from the environment only.

use std::fs;
use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use shared_utils::env::{MissingEnvVarError, get_env_var, get_secret_env_var};
use thiserror::Error;

pub const DEFAULT_CONFIG_PATH: &str = "quote_loader.toml";

pub const USER_ENV: &str = "QUOTE_TERMINAL_USER";
pub const PASSWORD_ENV: &str = "QUOTE_TERMINAL_PASS";
pub const APP_KEY_ENV: &str = "QUOTE_API_KEY";
pub const DATA_RECIPIENT_ENV: &str = "QUOTE_DATA_RECIPIENT";
pub const ERROR_RECIPIENT_ENV: &str = "QUOTE_ERROR_RECIPIENT";

/// Errors related to application configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error(transparent)]
    MissingEnvVar(#[from] MissingEnvVarError),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoaderConfig {
    pub provider: ProviderConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub dispatch: DispatchConfig,
    /// Instrument catalog file. The built-in catalog is used when absent.
    pub catalog: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProviderConfig {
    /// Base URL of the terminal's local API proxy.
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:9000".to_string(),
            timeout_secs: 60,
        }
    }
}

/// External commands used to drive the desktop terminal, as argv arrays.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// Starts the terminal application.
    pub launch_command: Vec<String>,
    /// Fills in the sign-in prompt. Receives the credentials through the
    /// `QUOTE_TERMINAL_USER` / `QUOTE_TERMINAL_PASS` environment of the child.
    pub login_command: Vec<String>,
    /// Accepts the "already signed in elsewhere" confirmation.
    pub confirm_command: Vec<String>,
    /// Exits with status 0 while the sign-in prompt is on screen.
    pub prompt_check_command: Vec<String>,
    /// Forcefully stops the terminal.
    pub terminate_command: Vec<String>,
    /// Dwell time around each sign-in step.
    pub login_wait_secs: u64,
    /// Dwell time for the application to finish loading, and between key
    /// registration attempts.
    pub app_wait_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            launch_command: Vec::new(),
            login_command: Vec::new(),
            confirm_command: Vec::new(),
            prompt_check_command: Vec::new(),
            terminate_command: vec![
                "taskkill".to_string(),
                "/f".to_string(),
                "/im".to_string(),
                "Eikon.exe".to_string(),
            ],
            login_wait_secs: 25,
            app_wait_secs: 50,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub fx_folder: PathBuf,
    pub gas_folder: PathBuf,
    pub fx_prefix: String,
    pub gas_prefix: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            fx_folder: PathBuf::from("fx_data"),
            gas_folder: PathBuf::from("gas_data"),
            fx_prefix: "fx_rates".to_string(),
            gas_prefix: "prices".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default, deny_unknown_fields)]
pub struct DispatchConfig {
    /// Directory the external mailer picks notifications up from.
    pub outbox: PathBuf,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            outbox: PathBuf::from("outbox"),
        }
    }
}

impl LoaderConfig {
    /// Loads `path`, or `quote_loader.toml` when no path is given. A missing default
    /// file yields the built-in defaults; a missing explicit file is an error.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };
        if !explicit && !path.exists() {
            return Ok(Self::default());
        }

        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml_str(&text).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_str(text: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("provider.base_url is empty".into()));
        }
        if self.provider.timeout_secs == 0 {
            return Err(ConfigError::Invalid("provider.timeout_secs must be > 0".into()));
        }
        if self.output.fx_prefix.trim().is_empty() || self.output.gas_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid("output prefixes cannot be empty".into()));
        }
        Ok(())
    }
}

/// Terminal credentials, read once at start-up.
pub struct Credentials {
    pub user: String,
    pub password: SecretString,
}

impl Credentials {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            user: get_env_var(USER_ENV)?,
            password: get_secret_env_var(PASSWORD_ENV)?,
        })
    }
}

/// Application key registered with the API proxy.
pub fn app_key_from_env() -> Result<SecretString, ConfigError> {
    Ok(get_secret_env_var(APP_KEY_ENV)?)
}
