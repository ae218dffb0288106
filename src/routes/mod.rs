//! HTTP route definitions and handlers.
//!
//! This module organizes all HTTP endpoints into logical groups:
//! the dashboard page, health checks, metrics exposition and the demo API.
//! Anything no route matches falls through to the static file directory.

mod api_routes;
mod health_routes;
mod metrics;
mod root;

pub use api_routes::{RouteInfo, ROUTES};

use crate::middleware;
use crate::state::AppState;
use crate::utils::http_helpers::not_found;
use axum::handler::HandlerWithoutStateExt;
use axum::Router;
use tower_http::services::ServeDir;

/// Creates the application router with all configured routes.
///
/// Combines all route modules into a single router, wraps it in the
/// middleware stack and attaches the application state.
pub fn create_router(state: AppState) -> Router {
    let static_files =
        ServeDir::new(&state.config.static_dir).not_found_service(not_found.into_service());

    let router = Router::new()
        .merge(root::routes())
        .merge(health_routes::routes())
        .merge(metrics::routes())
        .merge(api_routes::routes())
        .fallback_service(static_files);

    middleware::apply_middleware_stack(router, state.clone()).with_state(state)
}
