use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use log::{info, warn};
use serde::Serialize;
use serde_json::{json, Value};

use crate::pipeline::{PipelineStatusResponse, StatusSummary};

use super::error::ApiError;
use super::models::{CreateDeploymentRequest, UpdateDeploymentRequest};
use super::state::AppState;

type AppStateRef = State<Arc<AppState>>;

fn list_body<T: Serialize>(rows: Vec<T>) -> Json<Value> {
    let count = rows.len();
    Json(json!({ "success": true, "data": rows, "count": count }))
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|e| ApiError::Validation(format!("Invalid request body: {}", e.body_text())))
}

pub async fn count_requests(State(state): AppStateRef, request: Request, next: Next) -> Response {
    state.record_request();
    next.run(request).await
}

pub async fn health_handler(State(state): AppStateRef) -> impl IntoResponse {
    let (status, http_status, database) = match state.store.ping().await {
        Ok(()) => ("healthy", StatusCode::OK, "connected"),
        Err(e) => {
            warn!("Health check: store unreachable: {e}");
            ("degraded", StatusCode::SERVICE_UNAVAILABLE, "disconnected")
        }
    };

    (
        http_status,
        Json(json!({
            "status": status,
            "timestamp": Utc::now(),
            "database": database,
            "store": state.store.kind(),
        })),
    )
}

pub async fn metrics_handler(State(state): AppStateRef) -> Json<Value> {
    Json(json!({
        "uptimeSeconds": state.uptime_seconds(),
        "requestsServed": state.requests_served(),
        "pid": std::process::id(),
        "timestamp": Utc::now(),
        "monitoredJobs": state.jobs.len(),
    }))
}

pub async fn pipeline_status_handler(State(state): AppStateRef) -> Json<PipelineStatusResponse> {
    let pipelines = state.jenkins.collect_statuses(&state.jobs).await;
    let summary = StatusSummary::from_pipelines(&pipelines);

    Json(PipelineStatusResponse {
        success: true,
        timestamp: Utc::now(),
        jenkins_host: state.jenkins.host(),
        pipelines,
        summary,
    })
}

pub async fn list_users_handler(State(state): AppStateRef) -> Result<Json<Value>, ApiError> {
    Ok(list_body(state.store.list_users().await?))
}

pub async fn list_projects_handler(State(state): AppStateRef) -> Result<Json<Value>, ApiError> {
    Ok(list_body(state.store.list_projects().await?))
}

pub async fn list_deployments_handler(State(state): AppStateRef) -> Result<Json<Value>, ApiError> {
    Ok(list_body(state.store.list_deployments().await?))
}

pub async fn list_metrics_handler(State(state): AppStateRef) -> Result<Json<Value>, ApiError> {
    Ok(list_body(state.store.list_metrics().await?))
}

pub async fn create_deployment_handler(
    State(state): AppStateRef,
    payload: Result<Json<CreateDeploymentRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let deployment = json_body(payload)?
        .validate()
        .map_err(|message| ApiError::Validation(message.to_string()))?;

    let row = state.store.create_deployment(deployment).await?;
    info!(
        "Deployment {} created: project {} {} -> {}",
        row.id, row.project_id, row.version, row.environment
    );

    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": row }))))
}

pub async fn update_deployment_handler(
    State(state): AppStateRef,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateDeploymentRequest>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let not_found = || ApiError::NotFound("Deployment not found".to_string());

    let Path(id) = id.map_err(|_| not_found())?;
    let status = json_body(payload)?
        .validate()
        .map_err(|message| ApiError::Validation(message.to_string()))?;

    let row = state
        .store
        .update_deployment_status(id, &status)
        .await?
        .ok_or_else(not_found)?;
    info!("Deployment {id} is now {status}");

    Ok(Json(json!({ "success": true, "data": row })))
}
