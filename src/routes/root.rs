//! Interactive dashboard page.

use crate::state::AppState;
use axum::{response::Html, routing::get, Router};

const INDEX_HTML: &str = include_str!("../../templates/index.html");

/// Registers the dashboard route.
pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(index))
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}
