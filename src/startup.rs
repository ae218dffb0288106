//! Application startup and server initialization.
//!
//! This module builds the shared [`AppState`], binds the listener and serves
//! the router until a shutdown signal arrives.

use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::ServerError;
use crate::metrics::Metrics;
use crate::routes;
use crate::state::AppState;
use crate::utils::access_log::{AccessLog, TracingAccessLog};

/// Builds the production state: a fresh Prometheus registry and an access
/// log that writes through tracing.
pub fn build_state(config: Arc<Config>, port: u16) -> Result<AppState, ServerError> {
    let metrics = Metrics::new(&config.metrics)?;
    let access_log: Arc<dyn AccessLog> = Arc::new(TracingAccessLog);
    Ok(AppState::new(config, metrics, access_log, port))
}

/// Binds the configured address. Port 0 picks an ephemeral port.
pub async fn bind(config: &Config) -> Result<TcpListener, ServerError> {
    let address = config.bind_address();
    TcpListener::bind(&address)
        .await
        .map_err(|source| ServerError::Bind { address, source })
}

/// Serves the application on an already bound listener until `shutdown`
/// resolves. In-flight requests are allowed to finish.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = routes::create_router(state);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)
}

/// Initializes and runs the application server.
///
/// # Errors
///
/// Returns an error if the metrics registry cannot be built, the server
/// fails to bind to the configured address, or serving fails.
pub async fn run(config: Arc<Config>) -> Result<(), ServerError> {
    let listener = bind(&config).await?;
    let port = listener.local_addr().map_err(ServerError::Serve)?.port();
    let state = build_state(config, port)?;

    info!(port, "Server started on port {}", port);
    // stdout may be closed under a supervisor
    let _ = writeln!(std::io::stdout(), "Server running at http://localhost:{}", port);

    serve(listener, state, shutdown_signal()).await?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl-C, or SIGTERM on unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
