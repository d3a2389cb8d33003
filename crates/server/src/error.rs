use axum::{
    Json,
    extract::multipart::MultipartError,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use db::{
    DbErr,
    models::{
        attachment::AttachmentError, comment::CommentError, notification::NotificationError,
        project::ProjectError, project_member::ProjectMemberError, task::TaskError,
        user::UserError,
    },
};
use storage::StorageError;
use thiserror::Error;
use utils::response::ApiResponse;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    User(#[from] UserError),
    #[error(transparent)]
    Project(#[from] ProjectError),
    #[error(transparent)]
    ProjectMember(#[from] ProjectMemberError),
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error(transparent)]
    Comment(#[from] CommentError),
    #[error(transparent)]
    Attachment(#[from] AttachmentError),
    #[error(transparent)]
    Notification(#[from] NotificationError),
    #[error(transparent)]
    Database(#[from] DbErr),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error("Multipart error: {0}")]
    Multipart(#[from] MultipartError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error("Conflict: {0}")]
    Conflict(String),
}

impl From<&'static str> for ApiError {
    fn from(msg: &'static str) -> Self {
        ApiError::BadRequest(msg.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status_code, error_type) = match &self {
            ApiError::User(err) => match err {
                UserError::NotFound => (StatusCode::NOT_FOUND, "UserError"),
                UserError::DuplicateUsername => (StatusCode::CONFLICT, "UserError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "UserError"),
            },
            ApiError::Project(err) => match err {
                ProjectError::NotFound => (StatusCode::NOT_FOUND, "ProjectError"),
                ProjectError::ManagerNotFound => (StatusCode::BAD_REQUEST, "ProjectError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectError"),
            },
            ApiError::ProjectMember(err) => match err {
                ProjectMemberError::ProjectNotFound | ProjectMemberError::NotFound => {
                    (StatusCode::NOT_FOUND, "ProjectMemberError")
                }
                ProjectMemberError::UserNotFound => {
                    (StatusCode::BAD_REQUEST, "ProjectMemberError")
                }
                ProjectMemberError::AlreadyMember => {
                    (StatusCode::CONFLICT, "ProjectMemberError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "ProjectMemberError"),
            },
            ApiError::Task(err) => match err {
                TaskError::NotFound | TaskError::ProjectNotFound => {
                    (StatusCode::NOT_FOUND, "TaskError")
                }
                TaskError::AssigneeNotFound => (StatusCode::BAD_REQUEST, "TaskError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "TaskError"),
            },
            ApiError::Comment(err) => match err {
                CommentError::NotFound | CommentError::TaskNotFound => {
                    (StatusCode::NOT_FOUND, "CommentError")
                }
                CommentError::AuthorNotFound => (StatusCode::BAD_REQUEST, "CommentError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "CommentError"),
            },
            ApiError::Attachment(err) => match err {
                AttachmentError::NotFound => (StatusCode::NOT_FOUND, "AttachmentError"),
                AttachmentError::ParentNotFound => (StatusCode::NOT_FOUND, "AttachmentError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "AttachmentError"),
            },
            ApiError::Notification(err) => match err {
                NotificationError::NotFound | NotificationError::UserNotFound => {
                    (StatusCode::NOT_FOUND, "NotificationError")
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "NotificationError"),
            },
            ApiError::Database(err) => match err {
                DbErr::RecordNotFound(_) => (StatusCode::NOT_FOUND, "DatabaseError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "DatabaseError"),
            },
            ApiError::Storage(err) => match err {
                StorageError::NotFound(_) => (StatusCode::NOT_FOUND, "StorageError"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "StorageError"),
            },
            ApiError::Multipart(_) => (StatusCode::BAD_REQUEST, "MultipartError"),
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IoError"),
            ApiError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFoundError"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "InternalError"),
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BadRequestError"),
            ApiError::Conflict(_) => (StatusCode::CONFLICT, "ConflictError"),
        };

        let error_message = match &self {
            ApiError::Multipart(_) => {
                "Failed to upload file. Please ensure the file is valid and try again.".to_string()
            }
            ApiError::NotFound(msg) => msg.clone(),
            ApiError::Internal(msg) => msg.clone(),
            ApiError::BadRequest(msg) => msg.clone(),
            ApiError::Conflict(msg) => msg.clone(),
            _ => format!("{}: {}", error_type, self),
        };

        if status_code.is_server_error() {
            tracing::error!(
                status = %status_code,
                error_type,
                error = %self,
                "API request failed"
            );
        }
        let response = ApiResponse::<()>::error(&error_message);
        (status_code, Json(response)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: ApiError) -> StatusCode {
        err.into_response().status()
    }

    #[test]
    fn not_found_variants_map_to_404() {
        assert_eq!(status_of(UserError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ProjectError::NotFound.into()),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_of(TaskError::NotFound.into()), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(ApiError::Storage(StorageError::NotFound("k".into()))),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn conflicts_map_to_409() {
        assert_eq!(
            status_of(UserError::DuplicateUsername.into()),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(ProjectMemberError::AlreadyMember.into()),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn bad_references_map_to_400() {
        assert_eq!(
            status_of(TaskError::AssigneeNotFound.into()),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(ProjectError::ManagerNotFound.into()),
            StatusCode::BAD_REQUEST
        );
    }
}
