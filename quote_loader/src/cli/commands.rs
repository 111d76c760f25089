use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::logging::LogLevel;

/// Date format of `--date-start` / `--date-end`.
pub const CLI_DATE_FORMAT: &str = "%d.%m.%Y";

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Loads FX rates and gas prices from the desktop terminal and queues them for mailing"
)]
pub struct Cli {
    /// Path to the config file (quote_loader.toml)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Log level
    #[arg(short, long, value_enum, default_value_t = LogLevel::Info)]
    pub level: LogLevel,

    /// Existing directory for quote_loader.log
    #[arg(short = 'p', long, default_value = "./logs", value_parser = existing_dir)]
    pub log_path: PathBuf,

    /// Only retrieve data, without launching and terminating the terminal
    #[arg(long)]
    pub get: bool,

    /// Retrieve FX rates (default)
    #[arg(long, overrides_with = "no_fx")]
    pub fx: bool,

    /// Skip FX rates
    #[arg(long, overrides_with = "fx")]
    pub no_fx: bool,

    /// Retrieve gas prices (default)
    #[arg(long, overrides_with = "no_gas")]
    pub gas: bool,

    /// Skip gas prices
    #[arg(long, overrides_with = "gas")]
    pub no_gas: bool,

    /// Debug mode: also log to the console and print the run parameters
    #[arg(long)]
    pub debug: bool,

    /// Load the day this many days before today (1 means yesterday). Overrides the
    /// start and end dates.
    #[arg(short, long)]
    pub backoff: Option<u32>,

    /// First day to load, DD.MM.YYYY
    #[arg(long, value_parser = parse_cli_date)]
    pub date_start: Option<NaiveDate>,

    /// Last day to load, DD.MM.YYYY. Defaults to the start date.
    #[arg(long, value_parser = parse_cli_date)]
    pub date_end: Option<NaiveDate>,

    /// Total attempts per instrument
    #[arg(short, long, default_value_t = 3)]
    pub retry: u32,

    /// Seconds to wait before retrying a busy upstream
    #[arg(long, default_value_t = 15)]
    pub retry_delay: u64,

    /// Seconds to wait between FX and gas requests
    #[arg(long, default_value_t = 2)]
    pub type_delay: u64,

    /// Seconds to wait before each instrument
    #[arg(long, default_value_t = 1)]
    pub ric_delay: u64,
}

impl Cli {
    pub fn fx_enabled(&self) -> bool {
        !self.no_fx
    }

    pub fn gas_enabled(&self) -> bool {
        !self.no_gas
    }
}

pub fn parse_cli_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), CLI_DATE_FORMAT)
        .map_err(|e| format!("expected DD.MM.YYYY, got '{value}': {e}"))
}

fn existing_dir(value: &str) -> Result<PathBuf, String> {
    let path = PathBuf::from(value);
    if path.is_dir() {
        Ok(path)
    } else {
        Err(format!("log directory '{value}' does not exist"))
    }
}
