use axum::{
    Extension, Router,
    extract::{Query, State},
    middleware::from_fn_with_state,
    response::Json as ResponseJson,
    routing::{get, post},
};
use db::models::notification::Notification;
use serde::Deserialize;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_notification_middleware};

#[derive(Debug, Deserialize)]
pub struct NotificationListQuery {
    pub user_id: Option<Uuid>,
}

pub async fn get_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationListQuery>,
) -> Result<ResponseJson<ApiResponse<Vec<Notification>>>, ApiError> {
    let notifications = match query.user_id {
        Some(user_id) => Notification::find_by_user_id(&state.db().pool, user_id).await?,
        None => Notification::find_all(&state.db().pool).await?,
    };
    Ok(ResponseJson(ApiResponse::success(notifications)))
}

pub async fn get_notification(
    Extension(notification): Extension<Notification>,
) -> Result<ResponseJson<ApiResponse<Notification>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(notification)))
}

pub async fn mark_notification_read(
    Extension(existing): Extension<Notification>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<Notification>>, ApiError> {
    let notification = Notification::mark_read(&state.db().pool, existing.id).await?;
    Ok(ResponseJson(ApiResponse::success(notification)))
}

pub async fn delete_notification(
    Extension(notification): Extension<Notification>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let rows_affected = Notification::delete(&state.db().pool, notification.id).await?;
    if rows_affected == 0 {
        return Err(ApiError::NotFound("Notification not found".to_string()));
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

pub fn router(state: &AppState) -> Router<AppState> {
    let notification_id_router = Router::new()
        .route("/", get(get_notification).delete(delete_notification))
        .route("/read", post(mark_notification_read))
        .layer(from_fn_with_state(
            state.clone(),
            load_notification_middleware,
        ));

    let notifications_router = Router::new()
        .route("/", get(get_notifications))
        .nest("/{id}", notification_id_router);

    Router::new().nest("/notifications", notifications_router)
}
