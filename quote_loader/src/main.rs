use std::process::ExitCode;

use clap::Parser;
use quote_loader::cli::{self, commands::Cli};
use quote_loader::logging::init_logging;
use tracing::{error, info};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(err) = init_logging(&cli.log_path, cli.level, cli.debug) {
        eprintln!("Failed to initialize logging: {err}");
        return ExitCode::from(5);
    }
    info!(
        mode = if cli.debug { "debug" } else { "regular" },
        "quote loader started"
    );

    match cli::run(cli).await {
        Ok(()) => {
            info!("quote loader finished");
            ExitCode::SUCCESS
        }
        Err(err) => {
            error!(error = %err, "quote loader failed");
            ExitCode::from(u8::try_from(err.exit_code()).unwrap_or(1))
        }
    }
}
