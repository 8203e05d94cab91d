//! HTTP server exposing the dashboard

use crate::dashboard::{render_page, DashboardSnapshot};
use anyhow::{Context, Result};
use axum::extract::State;
use axum::response::Html;
use axum::routing::get;
use axum::{Json, Router};
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::info;

/// Browser refresh period for the HTML page
const PAGE_REFRESH_SECS: u64 = 1;

pub fn router(snapshots: watch::Receiver<DashboardSnapshot>) -> Router {
    Router::new()
        .route("/", get(page_handler))
        .route("/api/snapshot", get(snapshot_handler))
        .route("/healthz", get(healthz_handler))
        .with_state(snapshots)
}

/// Serve the dashboard until the process exits
pub async fn serve(bind: &str, snapshots: watch::Receiver<DashboardSnapshot>) -> Result<()> {
    let listener = TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind dashboard on {bind}"))?;
    info!(addr = %bind, "Dashboard listening");

    axum::serve(listener, router(snapshots))
        .await
        .context("Dashboard server stopped")
}

pub(crate) async fn page_handler(
    State(snapshots): State<watch::Receiver<DashboardSnapshot>>,
) -> Html<String> {
    let snapshot = snapshots.borrow().clone();
    Html(render_page(&snapshot, PAGE_REFRESH_SECS))
}

pub(crate) async fn snapshot_handler(
    State(snapshots): State<watch::Receiver<DashboardSnapshot>>,
) -> Json<DashboardSnapshot> {
    Json(snapshots.borrow().clone())
}

pub(crate) async fn healthz_handler() -> &'static str {
    "ok"
}
