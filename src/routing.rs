//! Wires the trends query and the administrative endpoints into a router.

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::{AppState, admin};

/// Create the router for the application.
///
/// The trends query is the only public read; everything under `/api/admin`
/// is the operator surface for the data-lifecycle jobs.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/api/trends", get(admin::get_trends))
        .route("/api/admin/archive", post(admin::post_archive))
        .route("/api/admin/archive/restore", post(admin::post_restore))
        .route("/api/admin/archive/cleanup", post(admin::post_cleanup))
        .route("/api/admin/archive/stats", get(admin::get_archive_stats))
        .route("/api/admin/maintenance", post(admin::post_maintenance))
        .route(
            "/api/admin/scheduler/status",
            get(admin::get_scheduler_status),
        )
        .route("/api/admin/monitor", get(admin::get_monitor))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
