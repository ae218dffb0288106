//! Request instrumentation: one counter increment, one duration sample and one
//! access log record per request.
//!
//! Recording happens when the response body has been fully handed to the
//! connection, not when the handler returns, so streamed and file bodies are
//! timed including their transfer.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::body::{Body, Bytes, HttpBody};
use axum::extract::{MatchedPath, Request, State};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{SecondsFormat, Utc};
use http_body::{Frame, SizeHint};
use tracing::debug;

use super::request_id::RequestId;
use crate::metrics::MetricsRecorder;
use crate::state::AppState;
use crate::utils::access_log::AccessLogEntry;

/// Recorded when the request or its response body is dropped before the
/// response was fully written, i.e. the client went away.
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// Times the request and records it once the response body has ended.
///
/// The route label is the matched route template; for requests no route
/// matched (static files, 404s) it is the literal path.
pub async fn track_requests(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| path.clone());
    let request_id = request
        .extensions()
        .get::<RequestId>()
        .map(|id| id.as_str().to_string())
        .unwrap_or_default();
    let is_head = request.method() == Method::HEAD;

    let mut guard = CompletionGuard {
        state,
        request_id,
        method: request.method().to_string(),
        path,
        route,
        started: Instant::now(),
        recorded: false,
    };

    let response = next.run(request).await;
    let status = response.status();
    let (parts, body) = response.into_parts();

    // nothing left to write: HEAD bodies are stripped by the router
    if is_head || body.is_end_stream() {
        guard.record(status.as_u16());
        return Response::from_parts(parts, body);
    }

    let body = InstrumentedBody {
        inner: body,
        status,
        guard: Some(guard),
    };
    Response::from_parts(parts, Body::new(body))
}

/// Response body that records its request when the last frame is taken.
/// Dropping it earlier records [`CLIENT_CLOSED_REQUEST`].
struct InstrumentedBody {
    inner: Body,
    status: StatusCode,
    guard: Option<CompletionGuard>,
}

impl InstrumentedBody {
    fn complete(&mut self, status: u16) {
        if let Some(mut guard) = self.guard.take() {
            guard.record(status);
        }
    }
}

impl HttpBody for InstrumentedBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        let polled = Pin::new(&mut this.inner).poll_frame(cx);

        match &polled {
            Poll::Ready(None) => this.complete(this.status.as_u16()),
            Poll::Ready(Some(Ok(_))) if this.inner.is_end_stream() => {
                this.complete(this.status.as_u16())
            }
            Poll::Ready(Some(Err(e))) => {
                debug!("Response body failed: {}", e);
                this.complete(StatusCode::INTERNAL_SERVER_ERROR.as_u16());
            }
            _ => {}
        }

        polled
    }

    fn is_end_stream(&self) -> bool {
        self.inner.is_end_stream()
    }

    fn size_hint(&self) -> SizeHint {
        self.inner.size_hint()
    }
}

/// Records exactly once: through `record`, or on drop if it never ran.
struct CompletionGuard {
    state: AppState,
    request_id: String,
    method: String,
    path: String,
    route: String,
    started: Instant,
    recorded: bool,
}

impl CompletionGuard {
    fn record(&mut self, status: u16) {
        if self.recorded {
            return;
        }
        self.recorded = true;

        let duration = self.started.elapsed().as_secs_f64();
        let status_code = status.to_string();
        let metrics = &self.state.metrics;
        metrics.record_http_request(&self.method, &self.route, &status_code);
        metrics.record_http_duration(duration, &self.method, &self.route, &status_code);

        self.state.access_log.record(AccessLogEntry {
            request_id: std::mem::take(&mut self.request_id),
            method: self.method.clone(),
            path: std::mem::take(&mut self.path),
            route: self.route.clone(),
            status,
            duration,
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        });
    }
}

impl Drop for CompletionGuard {
    fn drop(&mut self) {
        let status = if std::thread::panicking() {
            StatusCode::INTERNAL_SERVER_ERROR.as_u16()
        } else {
            CLIENT_CLOSED_REQUEST
        };
        self.record(status);
    }
}
