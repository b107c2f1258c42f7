use std::process::ExitCode;

use clap::Parser;
use decap_oauth_relay::{logging::setup_logging, CliOpts};
use tracing::info;

#[tokio::main]
async fn main() -> ExitCode {
    // initialize tracing
    if let Err(err) = setup_logging() {
        eprintln!("Failed to initialize logging: {:?}", err);
        return ExitCode::FAILURE;
    };

    let cli = CliOpts::parse();

    info!(
        "OAuth host: {} / Listening on {}",
        &cli.oauth_host, &cli.listener_addr
    );
    match decap_oauth_relay::start_server(cli).await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
