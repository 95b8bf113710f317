//! Request handlers. Role enforcement is this collaborator's job (§6): a
//! validated role label is read off the `x-user-role` header (defaulting to
//! `guest`) and handed down to the core as-is; a real deployment would
//! replace this with whatever session/JWT verification it already trusts.

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use uuid::Uuid;

use crate::dispatcher::{Role, ToolCallOptions};
use crate::domain::Feedback;
use crate::error::CellarError;
use crate::http::envelope::{ok, ApiResult};
use crate::pairing::{GuestPreferences, PairingContext, PairingOptions};
use crate::AppServices;

fn role_from_headers(headers: &HeaderMap) -> Role {
    match headers.get("x-user-role").and_then(|v| v.to_str().ok()) {
        Some("crew") => Role::Crew,
        Some("admin") => Role::Admin,
        _ => Role::Guest,
    }
}

fn actor_from_headers(headers: &HeaderMap) -> String {
    headers
        .get("x-actor-id")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("anonymous")
        .to_string()
}

pub async fn health_check(State(services): State<AppServices>) -> ApiResult<serde_json::Value> {
    services.db.health_check().await?;
    Ok(ok(serde_json::json!({ "status": "healthy" })))
}

#[derive(Debug, Deserialize)]
pub struct WineListQuery {
    pub region: Option<String>,
    pub wine_type: Option<String>,
}

pub async fn list_wines(
    State(services): State<AppServices>,
    Query(query): Query<WineListQuery>,
) -> ApiResult<Vec<crate::domain::Wine>> {
    let wines = services.wines.list_available(query.region.as_deref(), query.wine_type.as_deref()).await?;
    Ok(ok(wines))
}

#[derive(Debug, Deserialize)]
pub struct PairingRequest {
    pub dish: String,
    #[serde(default)]
    pub context: PairingContext,
    #[serde(default)]
    pub preferences: GuestPreferences,
    #[serde(default)]
    pub options: PairingOptions,
    #[serde(default)]
    pub quick: bool,
}

pub async fn generate_pairings(
    State(services): State<AppServices>,
    Json(request): Json<PairingRequest>,
) -> ApiResult<crate::pairing::PairingResult> {
    let result = if request.quick {
        services.pairing.quick_pairing(&request.dish, request.context, request.preferences, request.options).await?
    } else {
        services.pairing.generate_pairings(&request.dish, request.context, request.preferences, request.options).await?
    };
    services.realtime.publish(
        crate::realtime::EventKind::PairingSessionCreated,
        serde_json::json!({ "cached": result.cached }),
    );
    Ok(ok(result))
}

pub async fn submit_feedback(
    State(services): State<AppServices>,
    Json(feedback): Json<Feedback>,
) -> ApiResult<Feedback> {
    let stored = services.feedback_ingestion.submit(feedback).await?;
    services.realtime.publish(
        crate::realtime::EventKind::PairingFeedbackReceived,
        serde_json::json!({ "recommendation_id": stored.recommendation_id }),
    );
    Ok(ok(stored))
}

pub async fn get_user_profile(
    State(services): State<AppServices>,
    Path(user_id): Path<String>,
) -> ApiResult<crate::domain::UserProfile> {
    let profile = services.user_profiles.build(&user_id).await?;
    Ok(ok(profile))
}

#[derive(Debug, Deserialize)]
pub struct ToolCallRequest {
    pub params: serde_json::Value,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
    #[serde(default)]
    pub confirm: bool,
    pub idempotency_key: Option<String>,
}

fn default_dry_run() -> bool {
    true
}

pub async fn call_tool(
    State(services): State<AppServices>,
    Path(tool_name): Path<String>,
    headers: HeaderMap,
    Json(request): Json<ToolCallRequest>,
) -> ApiResult<serde_json::Value> {
    let role = role_from_headers(&headers);
    let actor = actor_from_headers(&headers);
    let options = ToolCallOptions { dry_run: request.dry_run, confirm: request.confirm, idempotency_key: request.idempotency_key };
    let result = services.dispatcher.call_tool(&tool_name, request.params, &actor, role, options).await?;
    Ok(ok(result))
}

#[derive(Debug, Deserialize)]
pub struct AssignmentRequest {
    pub allocation_unit_id: String,
}

pub async fn assign_variant(
    State(services): State<AppServices>,
    Path(experiment_id): Path<Uuid>,
    Json(request): Json<AssignmentRequest>,
) -> ApiResult<crate::domain::ExperimentAssignment> {
    let assignment = services.assignment_service.assign(experiment_id, &request.allocation_unit_id).await?;
    Ok(ok(assignment))
}

pub async fn get_experiment(
    State(services): State<AppServices>,
    Path(experiment_id): Path<Uuid>,
) -> ApiResult<crate::domain::Experiment> {
    let experiment = services.experiment_manager.get(experiment_id).await?;
    Ok(ok(experiment))
}

pub async fn ingest_events(
    State(services): State<AppServices>,
    Json(events): Json<Vec<crate::learning::NewExperimentEvent>>,
) -> ApiResult<u64> {
    let inserted = services.event_ingestion.ingest_batch(events).await?;
    Ok(ok(inserted))
}

#[derive(Debug, Deserialize)]
pub struct RumSubmission {
    pub name: String,
    pub value: f64,
    pub page: String,
    pub session_id: String,
    #[serde(default)]
    pub context: serde_json::Value,
}

pub async fn submit_rum(
    State(services): State<AppServices>,
    Json(submission): Json<RumSubmission>,
) -> ApiResult<()> {
    services.rum.record(crate::observability::RumMetric {
        name: submission.name,
        value: submission.value,
        page: submission.page,
        session_id: submission.session_id,
        recorded_at: chrono::Utc::now(),
        context: submission.context,
    });
    Ok(ok(()))
}

pub async fn rum_summary(
    State(services): State<AppServices>,
    Path(metric_name): Path<String>,
) -> ApiResult<crate::observability::rum::RumSummary> {
    let summary = services
        .rum
        .summarize(&metric_name)
        .ok_or_else(|| CellarError::not_found(format!("no RUM samples recorded for '{metric_name}'")))?;
    Ok(ok(summary))
}

/// Not wired to an actual Prometheus text-format render here to avoid
/// threading a `PrometheusHandle` through `AppServices` just for this demo
/// route; a real deployment installs the recorder at startup (see
/// [`crate::observability::install_prometheus_recorder`]) and renders it
/// directly from the handle it already holds.
pub async fn metrics_placeholder() -> &'static str {
    "metrics are exported via the installed PrometheusHandle::render(), not through this in-crate route"
}
