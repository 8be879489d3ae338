mod commands;
pub mod core;

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::commands::InstallArgs;

pub fn run() -> ExitCode {
    // Initialize structured logging; stdout is reserved for progress lines.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,ultimaesperanca_installer_lib=debug")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = InstallArgs::parse();
    tracing::info!("Última Esperança installer starting...");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!("Could not start the async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(commands::install(args)) {
        Ok(outcome) => commands::exit_code(&outcome),
        Err(err) => {
            tracing::error!("{err}");
            ExitCode::FAILURE
        }
    }
}
