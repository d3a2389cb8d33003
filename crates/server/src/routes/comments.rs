use axum::{
    Extension, Json, Router,
    extract::State,
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::get,
};
use db::models::comment::{Comment, UpdateComment};
use utils::response::ApiResponse;

use crate::{AppState, error::ApiError, middleware::load_comment_middleware};

pub async fn get_comment(
    Extension(comment): Extension<Comment>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(comment)))
}

pub async fn update_comment(
    Extension(existing): Extension<Comment>,
    State(state): State<AppState>,
    Json(payload): Json<UpdateComment>,
) -> Result<ResponseJson<ApiResponse<Comment>>, ApiError> {
    let comment = Comment::update(&state.db().pool, existing.id, &payload).await?;
    Ok(ResponseJson(ApiResponse::success(comment)))
}

pub async fn delete_comment(
    Extension(comment): Extension<Comment>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let storage_keys = Comment::delete(&state.db().pool, comment.id).await?;
    for key in storage_keys {
        if let Err(err) = state.files().delete(&key).await {
            tracing::warn!(key, error = %err, "failed to delete stored object");
        }
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let comment_id_router = Router::new()
        .route(
            "/",
            get(get_comment).put(update_comment).delete(delete_comment),
        )
        .layer(from_fn_with_state(state.clone(), load_comment_middleware));

    Router::new().nest("/comments/{id}", comment_id_router)
}
