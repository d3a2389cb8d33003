use axum::{
    Extension, Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson},
    routing::get,
};
use db::models::{
    comment::{Comment, CreateComment},
    task::{CreateTask, Task, UpdateTask},
};
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_task_middleware};

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub project_id: Option<Uuid>,
}

pub async fn get_tasks(
    State(state): State<AppState>,
    Query(query): Query<TaskListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Task>>>, ApiError> {
    let tasks = match query.project_id {
        Some(project_id) => Task::find_by_project_id(&state.db().pool, project_id).await?,
        None => Task::find_all(&state.db().pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(tasks)))
}

pub async fn get_task(
    Extension(task): Extension<Task>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn create_task(
    State(state): State<AppState>,
    Json(payload): Json<CreateTask>,
) -> Result<impl IntoResponse, ApiError> {
    tracing::debug!("Creating task '{}'", payload.title);
    let id = payload.id.unwrap_or_else(Uuid::new_v4);
    let task = Task::create(&state.db().pool, &payload, id).await?;
    let location = format!("/api/tasks/{}", task.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        ResponseJson(ApiResponse::success(task)),
    ))
}

pub async fn update_task(
    Extension(existing): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateTask>,
) -> Result<ResponseJson<ApiResponse<Task>>, ApiError> {
    let task = Task::update(&state.db().pool, existing.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(task)))
}

pub async fn delete_task(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let storage_keys = Task::delete(&state.db().pool, task.id).await?;
    for key in storage_keys {
        if let Err(err) = state.files().delete(&key).await {
            tracing::warn!(key, error = %err, "failed to delete stored object");
        }
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub async fn get_task_comments(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Vec<Comment>>>, ApiError> {
    let comments = Comment::find_by_task_id(&state.db().pool, task.id).await?;
    Ok(ResponseJson(ApiResponse::success(comments)))
}

/// Body for comments created under `/tasks/{id}/comments`; the task id
/// comes from the path.
#[derive(Debug, Deserialize)]
pub struct CreateTaskComment {
    #[serde(default)]
    pub id: Option<Uuid>,
    pub user_id: Uuid,
    pub body: String,
}

pub async fn create_task_comment(
    Extension(task): Extension<Task>,
    State(state): State<AppState>,
    Json(payload): Json<CreateTaskComment>,
) -> Result<impl IntoResponse, ApiError> {
    let id = payload.id.unwrap_or_else(Uuid::new_v4);
    let comment = Comment::create(
        &state.db().pool,
        &CreateComment {
            task_id: task.id,
            user_id: payload.user_id,
            body: payload.body,
        },
        id,
    )
    .await?;
    let location = format!("/api/comments/{}", comment.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        ResponseJson(ApiResponse::success(comment)),
    ))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let task_id_router = Router::new()
        .route("/", get(get_task).put(update_task).delete(delete_task))
        .route(
            "/comments",
            get(get_task_comments).post(create_task_comment),
        )
        .layer(from_fn_with_state(state.clone(), load_task_middleware));

    let tasks_router = Router::new()
        .route("/", get(get_tasks).post(create_task))
        .nest("/{id}", task_id_router);

    Router::new().nest("/tasks", tasks_router)
}
