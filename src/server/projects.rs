use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use chrono::Utc;
use uuid::Uuid;

use crate::auth::RequireUser;
use crate::error::Error;
use crate::server::AppState;
use crate::server::dto::{CreateProjectRequest, UpdateProjectRequest};
use crate::server::response::{ApiError, ApiResponse, StoreOptionExt, StoreResultExt};
use crate::server::validation::validate_title;
use crate::store::MAX_PROJECTS_PER_OWNER;
use crate::types::{CodeState, Project, ProjectPatch};

const PROJECT_NOT_FOUND: &str = "Project not found";

pub fn project_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/projects", get(list_projects).post(create_project))
        .route(
            "/projects/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/projects/{id}/versions", get(list_versions))
}

pub async fn list_projects(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    let projects = state
        .store
        .list_projects(&auth.user.id)
        .api_err("Failed to list projects")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(projects)))
}

pub async fn create_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateProjectRequest>,
) -> impl IntoResponse {
    let title = validate_title(&req.title)?;

    let now = Utc::now();
    let project = Project {
        id: Uuid::new_v4().to_string(),
        title,
        code: CodeState::new(
            req.html.unwrap_or_default(),
            req.css.unwrap_or_default(),
            req.javascript.unwrap_or_default(),
        ),
        owner_id: auth.user.id.clone(),
        created_at: now,
        updated_at: now,
    };

    match state.store.create_project(&project, MAX_PROJECTS_PER_OWNER) {
        Ok(()) => {}
        Err(e @ Error::ProjectLimit(_)) => return Err(ApiError::from(e)),
        Err(e) => {
            tracing::error!("Failed to create project: {e}");
            return Err(ApiError::internal("Failed to create project"));
        }
    }

    tracing::debug!(project_id = %project.id, owner = %auth.user.username, "project created");
    Ok::<_, ApiError>((StatusCode::CREATED, Json(ApiResponse::success(project))))
}

pub async fn get_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let project = state
        .store
        .get_project(&auth.user.id, &id)
        .api_err("Failed to get project")?
        .or_not_found(PROJECT_NOT_FOUND)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(project)))
}

/// Partial update. With `saveVersion` the buffers as they were before the
/// update are kept as a version.
pub async fn update_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<UpdateProjectRequest>,
) -> impl IntoResponse {
    let title = match req.title.as_deref() {
        Some(title) if !title.trim().is_empty() => Some(validate_title(title)?),
        _ => None,
    };

    let patch = ProjectPatch {
        title,
        markup: req.html,
        style: req.css,
        script: req.javascript,
    };

    let project = state
        .store
        .update_project(&auth.user.id, &id, &patch, req.save_version)
        .api_err("Failed to update project")?
        .or_not_found(PROJECT_NOT_FOUND)?;

    Ok::<_, ApiError>(Json(ApiResponse::success(project)))
}

pub async fn delete_project(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    let deleted = state
        .store
        .delete_project(&auth.user.id, &id)
        .api_err("Failed to delete project")?;

    if !deleted {
        return Err(ApiError::not_found(PROJECT_NOT_FOUND));
    }

    Ok::<_, ApiError>(StatusCode::NO_CONTENT)
}

pub async fn list_versions(
    auth: RequireUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> impl IntoResponse {
    state
        .store
        .get_project(&auth.user.id, &id)
        .api_err("Failed to get project")?
        .or_not_found(PROJECT_NOT_FOUND)?;

    let versions = state
        .store
        .list_project_versions(&auth.user.id, &id)
        .api_err("Failed to list versions")?;

    Ok::<_, ApiError>(Json(ApiResponse::success(versions)))
}
