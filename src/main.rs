use std::process::ExitCode;
use std::sync::Arc;

use greenroad::config::load_config;
use greenroad::error::ServerError;
use greenroad::startup;
use greenroad::utils::logger::init_logging;

// -- Entrypoint

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), ServerError> {
    let config = Arc::new(load_config()?);
    init_logging(&config.logging)?;
    startup::run(config).await
}
