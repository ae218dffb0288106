//! Demo API endpoints returning synthetic data.

use crate::state::AppState;
use axum::{extract::State, routing::get, Json, Router};
use chrono::{SecondsFormat, Utc};
use rand::Rng;
use serde::Serialize;

const APP_NAME: &str = env!("CARGO_PKG_NAME");
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// A route exposed by the service, as listed by `/api/demo`.
#[derive(Debug, Serialize)]
pub struct RouteInfo {
    pub method: &'static str,
    pub path: &'static str,
    pub description: &'static str,
}

/// Every route the service serves.
pub const ROUTES: &[RouteInfo] = &[
    RouteInfo {
        method: "GET",
        path: "/",
        description: "Interactive dashboard",
    },
    RouteInfo {
        method: "GET",
        path: "/health",
        description: "Liveness check with uptime",
    },
    RouteInfo {
        method: "GET",
        path: "/ready",
        description: "Readiness check",
    },
    RouteInfo {
        method: "GET",
        path: "/metrics",
        description: "Prometheus metrics",
    },
    RouteInfo {
        method: "GET",
        path: "/api/data",
        description: "Random demo data",
    },
    RouteInfo {
        method: "GET",
        path: "/api/info",
        description: "Application information",
    },
    RouteInfo {
        method: "GET",
        path: "/api/demo",
        description: "This list of routes",
    },
];

/// Registers the demo API routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/data", get(get_data))
        .route("/api/info", get(get_info))
        .route("/api/demo", get(get_demo))
}

#[derive(Serialize)]
struct DataResponse {
    message: &'static str,
    users: u32,
    requests: u32,
    uptime: f64,
    timestamp: String,
    version: &'static str,
}

#[derive(Serialize)]
struct InfoResponse {
    name: &'static str,
    version: &'static str,
    description: &'static str,
    uptime: f64,
    started_at: String,
}

#[derive(Serialize)]
struct DemoResponse {
    routes: &'static [RouteInfo],
}

/// Random user and request counters drawn from the state's random source.
async fn get_data(State(state): State<AppState>) -> Json<DataResponse> {
    let (users, requests) =
        state.with_rng(|rng| (rng.gen_range(1000..2000), rng.gen_range(5000..10000)));

    Json(DataResponse {
        message: "Data fetched successfully",
        users,
        requests,
        uptime: state.process.uptime_secs(),
        timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
        version: APP_VERSION,
    })
}

async fn get_info(State(state): State<AppState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        name: APP_NAME,
        version: APP_VERSION,
        description: APP_DESCRIPTION,
        uptime: state.process.uptime_secs(),
        started_at: state
            .process
            .started_at()
            .to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

async fn get_demo() -> Json<DemoResponse> {
    Json(DemoResponse { routes: ROUTES })
}
