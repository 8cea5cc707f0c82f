//! HTTP coordinator API: the Axum surface in front of the job store.
//!
//! Every handler is a thin translation layer — parse the request,
//! call exactly one [`sweep_store::JobStore`] method, map the result
//! (or error) onto the wire shape spec §4.3/§6 define. No business logic
//! lives here; it all lives in the store.

mod error;
mod handlers;
mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::trace::TraceLayer;

/// Build the coordinator's router. Callers attach the listener; this
/// function only wires routes, state, and tracing — no binding, no
/// background tasks, so it can be exercised directly with
/// `tower::ServiceExt::oneshot` in tests.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/request_job", post(handlers::request_job))
        .route("/update_job_status", post(handlers::update_job_status))
        .route("/ping", post(handlers::ping))
        .route("/change_job_status", post(handlers::change_job_status))
        .route("/jobs_paginated", get(handlers::jobs_paginated))
        .route("/job_stats", get(handlers::job_stats))
        .route("/api_stats", get(handlers::api_stats))
        .route("/database_info", get(handlers::database_info))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
