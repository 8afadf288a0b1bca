//! HTTP API: the JSON endpoints the operator UI calls.
//!
//! Status codes: 200 full success, 207 partial success, 400 bad input or no
//! usable credential, 500 when nothing could be done. Credential resolution
//! and input validation both happen before any remote call.

use std::sync::Arc;

use anyhow::Context;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::error::ProvisionError;
use crate::model::{require_non_empty, validate_rule_ids, validate_rule_specs, Rule, RuleSpec};
use crate::provision::{
    BatchResult, BatchStatus, MultiZoneResult, Provisioner, Verification, ZoneOutcome,
    ZoneReport,
};

#[derive(Clone)]
struct AppState {
    provisioner: Arc<Provisioner>,
}

/// Build the router. Exposed separately from [`serve`] so tests can mount it
/// on an ephemeral port.
pub fn router(provisioner: Arc<Provisioner>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/add-rules", post(add_rules))
        .route("/api/add-rules/batch", post(add_rules_batch))
        .route("/api/list-rules", post(list_rules))
        .route("/api/delete-rules", post(delete_rules))
        .layer(TraceLayer::new_for_http())
        .with_state(AppState { provisioner })
}

/// Bind `listen` and serve until Ctrl-C.
pub async fn serve(listen: &str, provisioner: Arc<Provisioner>) -> anyhow::Result<()> {
    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .with_context(|| format!("Failed to bind {listen}"))?;
    info!("Rule provisioner listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(provisioner))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

// --- API Types ---

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddRulesRequest {
    zone_id: Option<String>,
    rules: Option<Vec<RuleSpec>>,
    api_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddRulesBatchRequest {
    zone_ids: Option<Vec<String>>,
    rules: Option<Vec<RuleSpec>>,
    api_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListRulesRequest {
    zone_id: Option<String>,
    api_token: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRulesRequest {
    zone_id: Option<String>,
    ruleset_id: Option<String>,
    rule_ids: Option<Vec<String>>,
    api_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AddRulesResponse {
    success: bool,
    ruleset_id: String,
    added_rules: usize,
    total_rules: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    verification: Option<Verification>,
}

impl AddRulesResponse {
    fn new(ruleset_id: String, result: BatchResult) -> Self {
        Self {
            success: result.status() == BatchStatus::Success,
            ruleset_id,
            added_rules: result.succeeded,
            total_rules: result.attempted,
            errors: non_empty(result.failures),
            verification: result.verification,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ZoneResponse {
    zone_id: String,
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    ruleset_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    added_rules: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    total_rules: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    verification: Option<Verification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_kind: Option<&'static str>,
}

impl From<ZoneReport> for ZoneResponse {
    fn from(report: ZoneReport) -> Self {
        let success = report.succeeded();
        match report.outcome {
            ZoneOutcome::Completed { ruleset_id, batch } => Self {
                zone_id: report.zone_id,
                success,
                ruleset_id: Some(ruleset_id),
                added_rules: Some(batch.succeeded),
                total_rules: Some(batch.attempted),
                errors: non_empty(batch.failures),
                verification: batch.verification,
                error: None,
                error_kind: None,
            },
            ZoneOutcome::Failed { kind, error } => Self {
                zone_id: report.zone_id,
                success,
                ruleset_id: None,
                added_rules: None,
                total_rules: None,
                errors: None,
                verification: None,
                error: Some(error),
                error_kind: Some(kind),
            },
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct MultiZoneResponse {
    success: bool,
    status: BatchStatus,
    request_id: String,
    succeeded_zones: usize,
    failed_zones: usize,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    zones: Vec<ZoneResponse>,
}

impl From<MultiZoneResult> for MultiZoneResponse {
    fn from(result: MultiZoneResult) -> Self {
        let status = result.status();
        Self {
            success: status == BatchStatus::Success,
            status,
            request_id: result.request_id.to_string(),
            succeeded_zones: result.succeeded_zones(),
            failed_zones: result.failed_zones(),
            started_at: result.started_at,
            finished_at: result.finished_at,
            zones: result.zones.into_iter().map(ZoneResponse::from).collect(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ListRulesResponse {
    success: bool,
    ruleset_id: String,
    total_rules: usize,
    rules: Vec<Rule>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DeleteRulesResponse {
    success: bool,
    deleted_count: usize,
    total_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    errors: Option<Vec<String>>,
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: String,
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

impl IntoResponse for ProvisionError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed ({}): {self}", self.kind());
        } else {
            warn!("Request rejected ({}): {self}", self.kind());
        }
        let body = ErrorResponse {
            success: false,
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn non_empty(failures: Vec<String>) -> Option<Vec<String>> {
    if failures.is_empty() {
        None
    } else {
        Some(failures)
    }
}

fn bad_body(rejection: JsonRejection) -> ProvisionError {
    ProvisionError::Validation(format!("malformed request body: {}", rejection.body_text()))
}

/// Add flow keeps the worker's contract: anything short of full success is 207.
fn add_status(status: BatchStatus) -> StatusCode {
    match status {
        BatchStatus::Success => StatusCode::OK,
        BatchStatus::Partial | BatchStatus::Failed => StatusCode::MULTI_STATUS,
    }
}

fn aggregate_status(status: BatchStatus) -> StatusCode {
    match status {
        BatchStatus::Success => StatusCode::OK,
        BatchStatus::Partial => StatusCode::MULTI_STATUS,
        BatchStatus::Failed => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

// --- Handlers ---

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn add_rules(
    State(state): State<AppState>,
    payload: Result<Json<AddRulesRequest>, JsonRejection>,
) -> Result<Response, ProvisionError> {
    let Json(req) = payload.map_err(bad_body)?;
    let token = state.provisioner.resolve_token(req.api_token.as_deref())?;

    let zone_id = req.zone_id.unwrap_or_default();
    let rules = req.rules.unwrap_or_default();
    require_non_empty("zoneId", &zone_id)?;
    validate_rule_specs(&rules)?;

    info!("Adding {} rule(s) to zone {zone_id}", rules.len());
    let (ruleset_id, result) = state.provisioner.add_rules(&zone_id, &rules, &token).await?;

    let status = add_status(result.status());
    Ok((status, Json(AddRulesResponse::new(ruleset_id, result))).into_response())
}

async fn add_rules_batch(
    State(state): State<AppState>,
    payload: Result<Json<AddRulesBatchRequest>, JsonRejection>,
) -> Result<Response, ProvisionError> {
    let Json(req) = payload.map_err(bad_body)?;
    let token = state.provisioner.resolve_token(req.api_token.as_deref())?;

    let zone_ids = req.zone_ids.unwrap_or_default();
    let rules = req.rules.unwrap_or_default();
    if zone_ids.is_empty() {
        return Err(ProvisionError::Validation(
            "zoneIds array is required and must not be empty".into(),
        ));
    }
    for (position, zone_id) in zone_ids.iter().enumerate() {
        require_non_empty(&format!("zoneIds[{position}]"), zone_id)?;
    }
    validate_rule_specs(&rules)?;

    let result = state.provisioner.run(&zone_ids, &rules, &token).await;

    let status = aggregate_status(result.status());
    Ok((status, Json(MultiZoneResponse::from(result))).into_response())
}

async fn list_rules(
    State(state): State<AppState>,
    payload: Result<Json<ListRulesRequest>, JsonRejection>,
) -> Result<Json<ListRulesResponse>, ProvisionError> {
    let Json(req) = payload.map_err(bad_body)?;
    let token = state.provisioner.resolve_token(req.api_token.as_deref())?;

    let zone_id = req.zone_id.unwrap_or_default();
    require_non_empty("zoneId", &zone_id)?;

    let listing = state.provisioner.list_rules(&zone_id, &token).await?;
    Ok(Json(ListRulesResponse {
        success: true,
        ruleset_id: listing.ruleset_id,
        total_rules: listing.rules.len(),
        rules: listing.rules,
    }))
}

async fn delete_rules(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRulesRequest>, JsonRejection>,
) -> Result<Response, ProvisionError> {
    let Json(req) = payload.map_err(bad_body)?;
    let token = state.provisioner.resolve_token(req.api_token.as_deref())?;

    let zone_id = req.zone_id.unwrap_or_default();
    let ruleset_id = req.ruleset_id.unwrap_or_default();
    let rule_ids = req.rule_ids.unwrap_or_default();
    require_non_empty("zoneId", &zone_id)?;
    require_non_empty("rulesetId", &ruleset_id)?;
    validate_rule_ids(&rule_ids)?;

    info!("Deleting {} rule(s) from zone {zone_id}", rule_ids.len());
    let result = state
        .provisioner
        .remove(&zone_id, &ruleset_id, &rule_ids, &token)
        .await;

    let status = result.status();
    let body = DeleteRulesResponse {
        success: status == BatchStatus::Success,
        deleted_count: result.succeeded,
        total_count: result.attempted,
        errors: non_empty(result.failures),
    };
    Ok((aggregate_status(status), Json(body)).into_response())
}
