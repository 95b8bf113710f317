//! Route table (§6 "HTTP request surface"), grounded in the teacher's
//! `api::routes::create_routes` shape: one `Router` built from the
//! wired [`AppServices`], split into `.route(path, method(handler))` calls
//! grouped by subsystem.

use axum::routing::{get, post};
use axum::Router;

use crate::http::handlers;
use crate::AppServices;

pub fn build_router(services: AppServices) -> Router {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/metrics", get(handlers::metrics_placeholder))
        // Vintage Intelligence / inventory read surface
        .route("/api/v1/wines", get(handlers::list_wines))
        // Pairing Engine
        .route("/api/v1/pairings", post(handlers::generate_pairings))
        .route("/api/v1/feedback", post(handlers::submit_feedback))
        .route("/api/v1/users/:user_id/profile", get(handlers::get_user_profile))
        // Agent/Tool Dispatcher
        .route("/api/v1/tools/:tool_name", post(handlers::call_tool))
        // Online Learning & Experimentation
        .route("/api/v1/experiments/:experiment_id", get(handlers::get_experiment))
        .route("/api/v1/experiments/:experiment_id/assignments", post(handlers::assign_variant))
        .route("/api/v1/experiments/events", post(handlers::ingest_events))
        // Observability
        .route("/api/v1/rum", post(handlers::submit_rum))
        .route("/api/v1/rum/:metric_name", get(handlers::rum_summary))
        .with_state(services)
}
