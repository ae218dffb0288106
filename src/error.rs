//! Startup and runtime errors for the server process.

use std::io;

use thiserror::Error;

/// Failures that stop the server from starting or keep it from serving.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("error loading configuration: {0}")]
    Config(#[from] figment::Error),

    #[error("invalid logging configuration: {0}")]
    Logging(String),

    #[error("failed to set up metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),

    #[error("could not bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[source] io::Error),
}
