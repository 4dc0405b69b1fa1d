use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use itropa_core::models::*;
use itropa_core::{HistoryState, TreeError, WorkspaceSnapshot};

use crate::api::AppState;
use crate::render::render_need;
use crate::repository::RepositoryError;
use crate::service::{BatchAnalysis, ServiceError};

type ApiResult<T> = Result<T, (StatusCode, String)>;

// ============================================================
// Error Handling
// ============================================================

/// Map a service error to a status code.
///
/// Client mistakes are returned as-is. Everything else is logged in full
/// and the client only sees a generic message.
fn service_error(e: ServiceError) -> (StatusCode, String) {
    let status = match &e {
        ServiceError::NeedNotFound(_) | ServiceError::Tree(TreeError::ExpressionNotFound(_)) => {
            StatusCode::NOT_FOUND
        }
        ServiceError::Repository(RepositoryError::NeedNotFound(_)) => StatusCode::NOT_FOUND,
        ServiceError::InvalidInput(_) | ServiceError::Tree(_) => StatusCode::BAD_REQUEST,
        ServiceError::Repository(RepositoryError::Conflict { .. }) => StatusCode::CONFLICT,
        ServiceError::Generation(_) => StatusCode::BAD_GATEWAY,
        ServiceError::Repository(RepositoryError::Backend(_)) | ServiceError::CorruptHistory(_) => {
            tracing::error!("Internal error: {:#}", e);
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error".to_string(),
            );
        }
    };

    tracing::warn!("Request failed ({}): {}", status, e);
    (status, e.to_string())
}

fn parse_kind(kind: &str) -> ApiResult<AnalysisKind> {
    AnalysisKind::from_str(kind)
        .ok_or_else(|| (StatusCode::BAD_REQUEST, format!("Unknown analysis kind: {kind}")))
}

// ============================================================
// Health
// ============================================================

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Workspace
// ============================================================

pub async fn get_workspace(State(service): State<AppState>) -> Json<WorkspaceSnapshot> {
    Json(service.snapshot().await)
}

// ============================================================
// Needs
// ============================================================

#[derive(Debug, Deserialize)]
pub struct CreateNeedInput {
    pub name: String,
}

pub async fn list_needs(State(service): State<AppState>) -> Json<Vec<Need>> {
    Json(service.snapshot().await.needs)
}

pub async fn create_need(
    State(service): State<AppState>,
    Json(input): Json<CreateNeedInput>,
) -> ApiResult<(StatusCode, Json<Need>)> {
    service
        .research_need(&input.name)
        .await
        .map(|need| (StatusCode::CREATED, Json(need)))
        .map_err(service_error)
}

pub async fn get_need(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Need>> {
    service.need(id).await.map(Json).map_err(service_error)
}

pub async fn delete_need(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    service.delete_need(id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn close_need(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    service.close_need(id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn open_need(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Need>> {
    service.open_need(id).await.map(Json).map_err(service_error)
}

pub async fn activate_need(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    service.activate(id).await.map_err(service_error)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn get_need_tree(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<impl IntoResponse> {
    let need = service.need(id).await.map_err(service_error)?;
    Ok((
        [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
        render_need(&need),
    ))
}

// ============================================================
// Expressions
// ============================================================

#[derive(Debug, Deserialize)]
pub struct CrossPollinateInput {
    pub a: String,
    pub b: String,
}

pub async fn branch_expression(
    State(service): State<AppState>,
    Path((id, expression_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<Need>> {
    service
        .branch(id, &expression_id)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn delete_expression(
    State(service): State<AppState>,
    Path((id, expression_id)): Path<(Uuid, String)>,
) -> ApiResult<Json<Need>> {
    service
        .delete_expression(id, &expression_id)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn add_prediction(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<PredictionInput>,
) -> ApiResult<(StatusCode, Json<Need>)> {
    service
        .add_prediction(id, input)
        .await
        .map(|need| (StatusCode::CREATED, Json(need)))
        .map_err(service_error)
}

pub async fn cross_pollinate(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
    Json(input): Json<CrossPollinateInput>,
) -> ApiResult<Json<Vec<IndustryExpression>>> {
    service
        .cross_pollinate(id, &input.a, &input.b)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn adopt_hybrid(
    State(service): State<AppState>,
    Path(id): Path<Uuid>,
    Json(hybrid): Json<IndustryExpression>,
) -> ApiResult<(StatusCode, Json<Need>)> {
    service
        .adopt_hybrid(id, hybrid)
        .await
        .map(|need| (StatusCode::CREATED, Json(need)))
        .map_err(service_error)
}

// ============================================================
// Analyses
// ============================================================

pub async fn fetch_analysis(
    State(service): State<AppState>,
    Path((id, expression_id, kind)): Path<(Uuid, String, String)>,
) -> ApiResult<Json<CachedAnalysis>> {
    let kind = parse_kind(&kind)?;
    service
        .fetch_analysis(id, &expression_id, kind)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn analyze_all(
    State(service): State<AppState>,
    Path((id, kind)): Path<(Uuid, String)>,
) -> ApiResult<Json<BatchAnalysis>> {
    let kind = parse_kind(&kind)?;
    service
        .analyze_all(id, kind)
        .await
        .map(Json)
        .map_err(service_error)
}

pub async fn prune_analyses(
    State(service): State<AppState>,
) -> ApiResult<Json<serde_json::Value>> {
    let removed = service.prune_orphans().await.map_err(service_error)?;
    Ok(Json(serde_json::json!({ "removed": removed })))
}

// ============================================================
// History
// ============================================================

#[derive(Debug, Serialize)]
pub struct HistoryStepResponse {
    /// The action that was undone or redone; `None` when the stack was empty.
    pub action: Option<HistoryAction>,
    pub workspace: WorkspaceSnapshot,
}

pub async fn get_history(State(service): State<AppState>) -> Json<HistoryState> {
    Json(service.history().await)
}

pub async fn clear_history(State(service): State<AppState>) -> StatusCode {
    service.clear_history().await;
    StatusCode::NO_CONTENT
}

pub async fn undo(State(service): State<AppState>) -> ApiResult<Json<HistoryStepResponse>> {
    let action = service.undo().await.map_err(service_error)?;
    Ok(Json(HistoryStepResponse {
        action,
        workspace: service.snapshot().await,
    }))
}

pub async fn redo(State(service): State<AppState>) -> ApiResult<Json<HistoryStepResponse>> {
    let action = service.redo().await.map_err(service_error)?;
    Ok(Json(HistoryStepResponse {
        action,
        workspace: service.snapshot().await,
    }))
}
