//! Task API endpoints
//!
//! CRUD on the shared task collection plus the per-user views: filtered
//! list, statistics, filter badge counts, export, import and bulk clear.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use taskdesk_core::task::{FilterCounts, NewTask, Task, TaskPatch, TaskQuery, TaskStats};
use taskdesk_core::TaskId;

use super::{from_core, parse_user_id, route_error, RouteError};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub success: bool,
    pub removed: bool,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub success: bool,
    pub imported: usize,
}

#[derive(Debug, Serialize)]
pub struct ClearResponse {
    pub success: bool,
    pub removed: usize,
}

fn task_not_found() -> RouteError {
    route_error(StatusCode::NOT_FOUND, "Task not found")
}

// ============================================================================
// Collection handlers
// ============================================================================

/// GET /api/tasks - List all tasks
async fn list_tasks(State(state): State<AppState>) -> Result<Json<Vec<Task>>, RouteError> {
    let tasks = state.ctx().tasks().all_tasks().await.map_err(from_core)?;
    Ok(Json(tasks))
}

/// POST /api/tasks - Create a new task
async fn create_task(
    State(state): State<AppState>,
    Json(mut data): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), RouteError> {
    data.validate().map_err(from_core)?;

    if data.created_by.is_none() {
        let current = state.ctx().users().current_user().await.map_err(from_core)?;
        data.created_by = current.map(|user| user.id);
    }

    let created = state
        .ctx()
        .tasks()
        .create_task(data)
        .await
        .map_err(from_core)?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/tasks/{id} - Get a single task
async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Task>, RouteError> {
    let task = state
        .ctx()
        .tasks()
        .get_task(&TaskId::from(id))
        .await
        .map_err(from_core)?;
    task.map(Json).ok_or_else(task_not_found)
}

/// PATCH /api/tasks/{id} - Merge fields into a task
async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, RouteError> {
    let updated = state
        .ctx()
        .tasks()
        .update_task(&TaskId::from(id), patch)
        .await
        .map_err(from_core)?;
    updated.map(Json).ok_or_else(task_not_found)
}

/// DELETE /api/tasks/{id} - Remove a task; absent ids succeed
async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, RouteError> {
    let removed = state
        .ctx()
        .tasks()
        .delete_task(&TaskId::from(id))
        .await
        .map_err(from_core)?;
    Ok(Json(DeleteResponse {
        success: true,
        removed,
    }))
}

// ============================================================================
// Per-user handlers
// ============================================================================

/// GET /api/users/{id}/tasks - Filtered, searched and sorted task list
async fn user_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<TaskQuery>,
) -> Result<Json<Vec<Task>>, RouteError> {
    let user = parse_user_id(&id)?;
    let tasks = state
        .ctx()
        .tasks()
        .query_tasks(user, &query)
        .await
        .map_err(from_core)?;
    Ok(Json(tasks))
}

/// GET /api/users/{id}/tasks/stats
async fn task_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TaskStats>, RouteError> {
    let user = parse_user_id(&id)?;
    let stats = state
        .ctx()
        .tasks()
        .task_stats(user)
        .await
        .map_err(from_core)?;
    Ok(Json(stats))
}

/// GET /api/users/{id}/tasks/counts
async fn filter_counts(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<FilterCounts>, RouteError> {
    let user = parse_user_id(&id)?;
    let counts = state
        .ctx()
        .tasks()
        .filter_counts(user)
        .await
        .map_err(from_core)?;
    Ok(Json(counts))
}

/// GET /api/users/{id}/tasks/export - Download the user's tasks
async fn export_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, RouteError> {
    let user = parse_user_id(&id)?;
    let export = state
        .ctx()
        .tasks()
        .export_tasks(user)
        .await
        .map_err(from_core)?;

    let headers = [
        (header::CONTENT_TYPE, "application/json".to_string()),
        (
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", export.file_name),
        ),
    ];
    Ok((headers, export.contents))
}

/// POST /api/users/{id}/tasks/import - Body is the raw export file
async fn import_tasks(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: String,
) -> Result<Json<ImportResponse>, RouteError> {
    let user = parse_user_id(&id)?;
    let imported = state
        .ctx()
        .tasks()
        .import_tasks(&body, user)
        .await
        .map_err(from_core)?;
    Ok(Json(ImportResponse {
        success: true,
        imported,
    }))
}

/// POST /api/users/{id}/tasks/clear-completed
async fn clear_completed(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ClearResponse>, RouteError> {
    let user = parse_user_id(&id)?;
    let removed = state
        .ctx()
        .tasks()
        .clear_completed_tasks(user)
        .await
        .map_err(from_core)?;
    Ok(Json(ClearResponse {
        success: true,
        removed,
    }))
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/api/tasks", get(list_tasks).post(create_task))
        .route(
            "/api/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/api/users/{id}/tasks", get(user_tasks))
        .route("/api/users/{id}/tasks/stats", get(task_stats))
        .route("/api/users/{id}/tasks/counts", get(filter_counts))
        .route("/api/users/{id}/tasks/export", get(export_tasks))
        .route("/api/users/{id}/tasks/import", post(import_tasks))
        .route("/api/users/{id}/tasks/clear-completed", post(clear_completed))
}
