use std::str::FromStr;

use axum::{
    Extension, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::{StatusCode, header},
    middleware::from_fn_with_state,
    response::{IntoResponse, Json as ResponseJson, Response},
    routing::get,
};
use db::{
    models::attachment::{Attachment, CreateAttachment},
    types::AttachmentCategory,
};
use storage::MAX_UPLOAD_BYTES;
use utils::response::ApiResponse;
use uuid::Uuid;

use crate::{AppState, error::ApiError, middleware::load_attachment_middleware};

fn parse_category(raw: &str) -> Result<AttachmentCategory, ApiError> {
    AttachmentCategory::from_str(raw)
        .map_err(|_| ApiError::BadRequest(format!("Unknown attachment category '{raw}'")))
}

pub async fn list_files(
    State(state): State<AppState>,
    Path((category, parent_id)): Path<(String, Uuid)>,
) -> Result<ResponseJson<ApiResponse<Vec<Attachment>>>, ApiError> {
    let category = parse_category(&category)?;
    let attachments = Attachment::find_by_parent(&state.db().pool, category, parent_id).await?;
    Ok(ResponseJson(ApiResponse::success(attachments)))
}

/// Stores the object first, then the row. A failed row insert deletes the
/// object again so neither side leaks an orphan.
pub async fn upload_file(
    State(state): State<AppState>,
    Path((category, parent_id)): Path<(String, Uuid)>,
    mut multipart: Multipart,
) -> Result<impl IntoResponse, ApiError> {
    let category = parse_category(&category)?;

    let field = multipart
        .next_field()
        .await?
        .ok_or(ApiError::BadRequest("No file provided".to_string()))?;

    let original_name = field
        .file_name()
        .map(ToString::to_string)
        .ok_or(ApiError::BadRequest("Missing file name".to_string()))?;
    let mime_type = field.content_type().map(ToString::to_string);
    let bytes = field.bytes().await?;

    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ApiError::BadRequest(format!(
            "File is too large ({:.1} MB). Maximum file size is {:.0} MB.",
            bytes.len() as f64 / 1_048_576.0,
            MAX_UPLOAD_BYTES as f64 / 1_048_576.0
        )));
    }
    if bytes.is_empty() {
        return Err(ApiError::BadRequest("File is empty".to_string()));
    }

    let size_bytes = bytes.len() as i64;
    let key = storage::object_key(&category.to_string(), parent_id, &original_name);
    let url = state.files().put(&key, bytes, mime_type.as_deref()).await?;

    let attachment = Attachment::create(
        &state.db().pool,
        &CreateAttachment {
            category,
            parent_id,
            original_name,
            storage_key: key.clone(),
            url,
            size_bytes,
            mime_type,
        },
        Uuid::new_v4(),
    )
    .await;

    let attachment = match attachment {
        Ok(attachment) => attachment,
        Err(err) => {
            if let Err(cleanup_err) = state.files().delete(&key).await {
                tracing::warn!(key, error = %cleanup_err, "failed to remove orphaned object");
            }
            return Err(err.into());
        }
    };

    let location = format!("/api/files/{}", attachment.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        ResponseJson(ApiResponse::success(attachment)),
    ))
}

pub async fn get_file(
    Extension(attachment): Extension<Attachment>,
) -> Result<ResponseJson<ApiResponse<Attachment>>, ApiError> {
    Ok(ResponseJson(ApiResponse::success(attachment)))
}

pub async fn download_file(
    Extension(attachment): Extension<Attachment>,
    State(state): State<AppState>,
) -> Result<Response, ApiError> {
    let bytes = state.files().get(&attachment.storage_key).await?;
    let content_type = attachment
        .mime_type
        .clone()
        .unwrap_or_else(|| "application/octet-stream".to_string());
    let disposition = format!(
        "attachment; filename=\"{}\"",
        attachment.original_name.replace('"', "")
    );

    Ok((
        [
            (header::CONTENT_TYPE, content_type),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

pub async fn delete_file(
    Extension(attachment): Extension<Attachment>,
    State(state): State<AppState>,
) -> Result<ResponseJson<ApiResponse<()>>, ApiError> {
    let storage_key = Attachment::delete(&state.db().pool, attachment.id).await?;
    // the row is gone; a stale object is only worth a warning
    if let Err(err) = state.files().delete(&storage_key).await {
        tracing::warn!(key = storage_key, error = %err, "failed to delete stored object");
    }
    Ok(ResponseJson(ApiResponse::success(())))
}

/// Serves stored objects by key for clients following the `url` field of an
/// attachment in local storage mode.
pub async fn serve_by_key(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ApiError> {
    let bytes = state.files().get(&key).await?;
    let content_type = mime_guess::from_path(&key)
        .first_or_octet_stream()
        .to_string();
    Ok(([(header::CONTENT_TYPE, content_type)], bytes).into_response())
}

pub fn router(state: &AppState) -> Router<AppState> {
    let file_id_router = Router::new()
        .route("/", get(get_file).delete(delete_file))
        .route("/download", get(download_file))
        .layer(from_fn_with_state(state.clone(), load_attachment_middleware));

    let files_router = Router::new()
        .route("/{category}/{parent_id}", get(list_files).post(upload_file))
        .nest("/{id}", file_id_router)
        // above the cap so the size check answers 400 instead of the
        // transport rejecting the body outright
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + 64 * 1024));

    Router::new().nest("/files", files_router)
}
