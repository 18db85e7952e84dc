//! Route handlers and server lifecycle for the task API.

use axum::{
    Router,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, put},
};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

use crate::config::{Config, TasksConfig};
use crate::db::Database;
use crate::error::{ErrorBody, TaskError, TaskResult};
use crate::types::{DeleteResponse, NewTask, ReorderRequest, ReorderResponse, Task, TaskPatch};
use crate::validate::parse_task_id;

/// State shared across handlers.
#[derive(Clone)]
pub struct ApiState {
    db: Arc<Database>,
    tasks: Arc<TasksConfig>,
}

impl ApiState {
    pub fn new(db: Arc<Database>, tasks: TasksConfig) -> Self {
        Self {
            db,
            tasks: Arc::new(tasks),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn tasks_config(&self) -> &TasksConfig {
        &self.tasks
    }
}

#[derive(Serialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

impl IntoResponse for TaskError {
    fn into_response(self) -> Response {
        let status = match &self {
            TaskError::Validation { .. } => StatusCode::BAD_REQUEST,
            TaskError::NotFound(_) => StatusCode::NOT_FOUND,
            TaskError::Storage(err) => {
                error!("Storage failure: {:#}", err);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorEnvelope {
            error: self.to_body(),
        };
        (status, Json(body)).into_response()
    }
}

/// Malformed bodies are client errors, not the framework's default 422.
fn body_error(rejection: JsonRejection) -> TaskError {
    TaskError::invalid_value("body", rejection.body_text())
}

/// Health check response.
#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn health() -> impl IntoResponse {
    Json(HealthResponse {
        status: "OK",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn list_active(State(state): State<ApiState>) -> TaskResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_active_tasks()?))
}

async fn list_completed(State(state): State<ApiState>) -> TaskResult<Json<Vec<Task>>> {
    Ok(Json(state.db().list_completed_tasks()?))
}

async fn get_task(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> TaskResult<Json<Task>> {
    let id = parse_task_id(&raw_id)?;
    Ok(Json(state.db().get_task(id)?))
}

async fn create_task(
    State(state): State<ApiState>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> TaskResult<(StatusCode, Json<Task>)> {
    let Json(input) = payload.map_err(body_error)?;
    let task = state.db().create_task(input)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn update_task(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> TaskResult<Json<Task>> {
    let id = parse_task_id(&raw_id)?;
    let Json(patch) = payload.map_err(body_error)?;
    let task = state.db().update_task(id, &patch, state.tasks_config())?;
    Ok(Json(task))
}

async fn reorder_tasks(
    State(state): State<ApiState>,
    payload: Result<Json<ReorderRequest>, JsonRejection>,
) -> TaskResult<Json<ReorderResponse>> {
    let Json(request) = payload.map_err(body_error)?;
    let updated = state
        .db()
        .reorder_tasks(&request.tasks, state.tasks_config())?;
    Ok(Json(ReorderResponse {
        message: "Task order updated".to_string(),
        updated,
    }))
}

async fn delete_task(
    State(state): State<ApiState>,
    Path(raw_id): Path<String>,
) -> TaskResult<Json<DeleteResponse>> {
    let id = parse_task_id(&raw_id)?;
    let task = state.db().delete_task(id)?;
    Ok(Json(DeleteResponse {
        message: "Task deleted".to_string(),
        task,
    }))
}

fn collection_path(base: &str) -> String {
    let trimmed = base.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn member_path(base: &str, suffix: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), suffix)
}

/// Build the router with all routes mounted under `base_path`.
pub fn build_router(state: ApiState, base_path: &str) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(
            &collection_path(base_path),
            get(list_active).post(create_task),
        )
        .route(&member_path(base_path, "completed"), get(list_completed))
        .route(&member_path(base_path, "reorder"), put(reorder_tasks))
        .route(
            &member_path(base_path, "{id}"),
            get(get_task).put(update_task).delete(delete_task),
        )
        .route("/health", get(health))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Handle for a running server.
pub struct ServerHandle {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Address the listener is bound to.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Stop accepting connections and wait for in-flight requests.
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Err(e) = self.task.await {
            error!("Server task ended abnormally: {}", e);
        }
    }
}

/// Bind the configured address and serve in a background task.
pub async fn start_server(db: Arc<Database>, config: &Config) -> anyhow::Result<ServerHandle> {
    let state = ApiState::new(db, config.tasks.clone());
    let app = build_router(state, &config.server.base_path);

    let listener =
        tokio::net::TcpListener::bind((config.server.host.as_str(), config.server.port)).await?;
    let addr = listener.local_addr()?;

    info!("Task API listening on http://{}{}", addr, config.server.base_path);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                info!("Task API shutting down");
            })
            .await
        {
            error!("Server error: {}", e);
        }
    });

    Ok(ServerHandle {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_health_response_serialization() {
        let response = HealthResponse {
            status: "OK",
            version: "0.1.0",
        };
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("OK"));
        assert!(json.contains("0.1.0"));
    }

    #[test]
    fn route_paths_tolerate_trailing_slash() {
        assert_eq!(collection_path("/todo/api/tasks/"), "/todo/api/tasks");
        assert_eq!(collection_path("/"), "/");
        assert_eq!(member_path("/", "{id}"), "/{id}");
        assert_eq!(member_path("/todo/api/tasks", "reorder"), "/todo/api/tasks/reorder");
    }

    #[test]
    fn error_status_codes() {
        assert_eq!(
            TaskError::no_fields().into_response().status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            TaskError::NotFound(3).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            TaskError::storage(anyhow::anyhow!("disk I/O error"))
                .into_response()
                .status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
