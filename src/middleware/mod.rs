//! # Request middleware
//!
//! Every route and the static-file fallback run behind the same stack:
//! request id assignment, then instrumentation, then panic recovery.

pub mod instrumentation;
pub mod request_id;

use std::any::Any;

use axum::http::StatusCode;
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::catch_panic::CatchPanicLayer;
use tracing::error;

use crate::state::AppState;
use crate::utils::http_helpers::HTTPError;

/// Apply the middleware stack to a router whose routes (and fallback) are
/// already declared. Layers added later wrap earlier ones, so the request id
/// is assigned first and panics are converted to 500s before instrumentation
/// sees the response.
pub fn apply_middleware_stack(router: Router<AppState>, state: AppState) -> Router<AppState> {
    router
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(
            state,
            instrumentation::track_requests,
        ))
        .layer(middleware::from_fn(request_id::add_request_id))
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<String>() {
        s.as_str()
    } else if let Some(s) = err.downcast_ref::<&str>() {
        s
    } else {
        "unknown panic payload"
    };
    error!(panic = detail, "Request handler panicked");

    HTTPError::new(StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
}
