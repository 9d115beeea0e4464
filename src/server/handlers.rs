use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::error::ApiError;
use super::AppState;
use crate::error::CodefixError;
use crate::services::{IngestRequest, ProjectDetails, ProjectListing};

type ApiResult<T> = Result<Json<T>, ApiError>;

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CloneBody {
    pub repo_url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub tasks: Option<Vec<Value>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalyzeFileBody {
    pub project_id: Option<String>,
    pub repo_name: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FileContentBody {
    pub repo_name: Option<String>,
    pub file_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DebugFileBody {
    pub file_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DeleteRepoBody {
    pub repo_name: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /api/projects/clone, /api/projects/clone-repo
pub async fn clone_repository(
    State(state): State<AppState>,
    payload: Result<Json<CloneBody>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;

    let request = IngestRequest {
        repo_url: body.repo_url.unwrap_or_default(),
        title: body.title,
        description: body.description,
        tasks: body.tasks.unwrap_or_default(),
    };

    let outcome = state
        .codefix
        .ingestion
        .ingest(request)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to clone repository"))?;

    let response = match outcome.record {
        Some(project) => json!({
            "message": "Repository cloned and project created successfully",
            "project": project,
        }),
        None => json!({
            "message": "Repository cloned successfully",
            "repoName": outcome.repo_name,
            "files": outcome.files,
        }),
    };
    Ok(Json(response))
}

/// POST /api/projects/analyze-file
pub async fn analyze_file(
    State(state): State<AppState>,
    payload: Result<Json<AnalyzeFileBody>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let file_path = body.file_path.unwrap_or_default();
    let analysis = &state.codefix.analysis;

    let result = match (non_empty(body.project_id), non_empty(body.repo_name)) {
        (Some(project_id), _) => analysis.analyze_project(&project_id, &file_path).await,
        (None, Some(repo_name)) => analysis.analyze_repo_file(&repo_name, &file_path).await,
        (None, None) => Err(CodefixError::validation(if state.codefix.has_records() {
            "Project ID and file path are required"
        } else {
            "Repository name and file path are required"
        })),
    };

    let analysis = result.map_err(|e| ApiError::from_error(e, "Failed to analyze file"))?;
    Ok(Json(json!({
        "fileContent": analysis.file_content,
        "debuggedResult": analysis.debugged_result,
    })))
}

/// POST /api/projects/get-file-content
pub async fn get_file_content(
    State(state): State<AppState>,
    payload: Result<Json<FileContentBody>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let content = state
        .codefix
        .analysis
        .read_file(
            body.repo_name.as_deref().unwrap_or_default(),
            body.file_path.as_deref().unwrap_or_default(),
        )
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to read file"))?;
    Ok(Json(json!({ "content": content })))
}

/// POST /api/projects/debug-file
pub async fn debug_file(
    State(state): State<AppState>,
    payload: Result<Json<DebugFileBody>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let content = body
        .file_content
        .ok_or_else(|| ApiError::bad_request("File content is required"))?;

    let debugged_result = state
        .codefix
        .analysis
        .analyze_content(&content)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to debug file"))?;
    Ok(Json(json!({ "debuggedResult": debugged_result })))
}

/// GET /api/projects
pub async fn list_projects(State(state): State<AppState>) -> ApiResult<ProjectListing> {
    let listing = state
        .codefix
        .catalog
        .list()
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to fetch projects"))?;
    Ok(Json(listing))
}

/// GET /api/projects/:id
pub async fn get_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<ProjectDetails> {
    let project = state
        .codefix
        .catalog
        .get(&id)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to fetch project"))?;
    Ok(Json(project))
}

/// DELETE /api/projects/:id
pub async fn delete_project(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Value> {
    state
        .codefix
        .catalog
        .delete(&id)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to delete project"))?;
    Ok(Json(json!({ "message": "Project deleted successfully" })))
}

/// DELETE /api/projects with `{ "repoName": ... }`
pub async fn delete_repository(
    State(state): State<AppState>,
    payload: Result<Json<DeleteRepoBody>, JsonRejection>,
) -> ApiResult<Value> {
    let Json(body) = payload?;
    let repo_name = body.repo_name.unwrap_or_default();
    state
        .codefix
        .catalog
        .delete_repository(&repo_name)
        .await
        .map_err(|e| ApiError::from_error(e, "Failed to delete repository"))?;
    debug!(repo = %repo_name, "Repository removed via API");
    Ok(Json(json!({ "message": "Repository deleted successfully" })))
}

/// GET /api/health
pub async fn health() -> Json<Value> {
    Json(json!({
        "status": "ok",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}
