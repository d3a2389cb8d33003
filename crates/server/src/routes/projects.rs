use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson},
    routing::{delete, get, post},
};
use db::models::{
    project::{CreateProject, Project, UpdateProject},
    project_member::{CreateProjectMember, ProjectMember},
    task::Task,
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_project_middleware};

#[derive(Debug, Deserialize)]
pub struct ProjectListQuery {
    #[serde(default)]
    pub include_archived: bool,
}

pub async fn get_projects(
    State(state): State<AppState>,
    Query(query): Query<ProjectListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Project>>>, ApiError> {
    let projects = Project::find_all(&state.db().pool, query.include_archived).await?;
    Ok(ResponseJson(ApiResponse::success(projects)))
}

pub async fn get_project(
    Extension(project): Extension<Project>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn create_project(
    State(state): State<AppState>,
    Json(payload): Json<CreateProject>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Creating project '{}'", payload.name);
    let id = payload.id.unwrap_or_else(Uuid::new_v4);
    let project = Project::create(&state.db().pool, &payload, id).await?;
    let location = format!("/api/projects/{}", project.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        ResponseJson(ApiResponse::success(project)),
    ))
}

pub async fn update_project(
    Extension(existing): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateProject>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = Project::update(&state.db().pool, existing.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn delete_project(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let storage_keys = Project::delete(&state.db().pool, project.id).await?;
    // rows are gone; stale objects are only worth a warning
    for key in storage_keys {
        if let Err(err) = state.files().delete(&key).await {
            tracing::warn!(key, error = %err, "failed to delete stored object");
        }
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn archive_project(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = Project::set_archived(&state.db().pool, project.id, true).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn unarchive_project(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Project>>, ApiError> {
    let project = Project::set_archived(&state.db().pool, project.id, false).await?;
    Ok(ResponseJson(ApiResponse::success(project)))
}

pub async fn get_project_tasks(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = Task::find_by_project_id(&state.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_project_members(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<ProjectMember>>>, ApiError> {
    let members = ProjectMember::find_by_project_id(&state.db().pool, project.id).await?;
    Ok(ResponseJson(ApiResponse::success(members)))
}

pub async fn add_project_member(
    Extension(project): Extension<Project>,
    State(state): State<AppState>,
    Json(payload): Json<CreateProjectMember>,
) -> Result<impl IntoResponse, ApiError> {
    let member = ProjectMember::add(&state.db().pool, project.id, &payload).await?;
    Ok((
        StatusCode::CREATED,
        ResponseJson(ApiResponse::success(member)),
    ))
}

pub async fn remove_project_member(
    State(state): State<AppState>,
    Path((project_id, user_id)): Path<(Uuid, Uuid)>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    ProjectMember::remove(&state.db().pool, project_id, user_id).await?;
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let project_id_router = Router::new()
        .route(
            "/",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/archive", post(archive_project))
        .route("/unarchive", post(unarchive_project))
        .route("/tasks", get(get_project_tasks))
        .route(
            "/members",
            get(get_project_members).post(add_project_member),
        )
        .layer(from_fn_with_state(state.clone(), load_project_middleware));

    let projects_router = Router::new()
        .route("/", get(get_projects).post(create_project))
        .route(
            "/{project_id}/members/{user_id}",
            delete(remove_project_member),
        )
        .nest("/{id}", project_id_router);

    Router::new().nest("/projects", projects_router)
}
