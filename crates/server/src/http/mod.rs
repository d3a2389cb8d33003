use axum::{Router, routing::get};
use tower_http::cors::CorsLayer;

use crate::{AppState, routes};

pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(routes::users::router(&state))
        .merge(routes::projects::router(&state))
        .merge(routes::tasks::router(&state))
        .merge(routes::comments::router(&state))
        .merge(routes::notifications::router(&state))
        .merge(routes::files::router(&state));

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/files/{*key}", get(routes::files::serve_by_key))
        .nest("/api", api_routes)
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Request, StatusCode, header},
    };
    use serde_json::{Value, json};
    use tower::ServiceExt;
    use uuid::Uuid;

    use crate::{AppState, test_support::TestEnvGuard};

    async fn setup_state() -> (TestEnvGuard, AppState, std::path::PathBuf) {
        let temp_root = std::env::temp_dir().join(format!("taskboard-test-{}", Uuid::new_v4()));
        std::fs::create_dir_all(&temp_root).unwrap();

        let db_path = temp_root.join("db.sqlite");
        let db_url = format!("sqlite://{}?mode=rwc", db_path.to_string_lossy());
        let env_guard = TestEnvGuard::new(&temp_root, db_url);

        let state = AppState::new(config::Config::default()).await.unwrap();

        (env_guard, state, temp_root)
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn create_user(app: &axum::Router, username: &str) -> Uuid {
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/users",
                json!({
                    "username": username,
                    "email": format!("{username}@example.com"),
                    "password": "secret",
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        body["data"]["id"].as_str().unwrap().parse().unwrap()
    }

    #[tokio::test]
    async fn health_check_works() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn create_returns_201_with_location() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/users",
                json!({
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "secret",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let location = response
            .headers()
            .get(header::LOCATION)
            .unwrap()
            .to_str()
            .unwrap()
            .to_string();
        let body = body_json(response).await;
        assert_eq!(body["success"], true);
        assert_eq!(
            location,
            format!("/api/users/{}", body["data"]["id"].as_str().unwrap())
        );
    }

    #[tokio::test]
    async fn create_honors_a_caller_supplied_id() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        let wanted = Uuid::new_v4();
        let response = app
            .oneshot(post_json(
                "/api/users",
                json!({
                    "id": wanted,
                    "username": "alice",
                    "email": "alice@example.com",
                    "password": "secret",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["data"]["id"].as_str().unwrap(), wanted.to_string());
    }

    #[tokio::test]
    async fn duplicate_username_is_conflict() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        create_user(&app, "bob").await;
        let response = app
            .oneshot(post_json(
                "/api/users",
                json!({
                    "username": "bob",
                    "email": "other@example.com",
                    "password": "secret",
                }),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CONFLICT);
        let body = body_json(response).await;
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn unknown_project_is_404() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/projects/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn project_task_comment_flow() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        let manager = create_user(&app, "carol").await;

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/projects",
                json!({"name": "Apollo", "manager_id": manager}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let project = body_json(response).await;
        let project_id = project["data"]["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(post_json(
                "/api/tasks",
                json!({
                    "project_id": project_id,
                    "title": "Write docs",
                    "assignee_id": manager,
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let task = body_json(response).await;
        let task_id = task["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(task["data"]["status"], "todo");

        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/tasks/{task_id}/comments"),
                json!({"user_id": manager, "body": "On it"}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);

        // server-side filter returns exactly this task
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri(format!("/api/tasks?project_id={project_id}"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let tasks = body_json(response).await;
        assert_eq!(tasks["data"].as_array().unwrap().len(), 1);

        // assignment produced a notification for the manager
        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/users/{manager}/notifications"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let notifications = body_json(response).await;
        assert_eq!(notifications["data"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn upload_and_download_roundtrip() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        let manager = create_user(&app, "dave").await;
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/projects",
                json!({"name": "Apollo", "manager_id": manager}),
            ))
            .await
            .unwrap();
        let project = body_json(response).await;
        let project_id = project["data"]["id"].as_str().unwrap().to_string();

        let boundary = "----taskboardtest";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"notes.txt\"\r\nContent-Type: text/plain\r\n\r\nhello world\r\n--{boundary}--\r\n"
        );
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/files/project/{project_id}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let attachment = body_json(response).await;
        let attachment_id = attachment["data"]["id"].as_str().unwrap().to_string();
        assert_eq!(attachment["data"]["original_name"], "notes.txt");
        assert_eq!(attachment["data"]["size_bytes"], 11);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/files/{attachment_id}/download"))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain"
        );
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"hello world");
    }

    #[tokio::test]
    async fn oversize_upload_is_rejected_and_nothing_is_written() {
        let (_guard, state, temp_root) = setup_state().await;
        let app = super::router(state);

        let manager = create_user(&app, "erin").await;
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/projects",
                json!({"name": "Apollo", "manager_id": manager}),
            ))
            .await
            .unwrap();
        let project = body_json(response).await;
        let project_id = project["data"]["id"].as_str().unwrap().to_string();

        let boundary = "----taskboardtest";
        let mut body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"big.bin\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend(std::iter::repeat_n(0u8, storage::MAX_UPLOAD_BYTES + 1));
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        let response = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/api/files/project/{project_id}"))
                    .header(
                        header::CONTENT_TYPE,
                        format!("multipart/form-data; boundary={boundary}"),
                    )
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(!temp_root.join("uploads").exists());
    }

    #[tokio::test]
    async fn unknown_attachment_category_is_400() {
        let (_guard, state, _) = setup_state().await;
        let app = super::router(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(format!("/api/files/folder/{}", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
