/// Axum mock of the remote board store and chat endpoint, backed by a
/// `MemoryStore`. Records every request so tests can assert on the exact
/// HTTP traffic.
use std::sync::{Arc, Mutex};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use planboard_core::storage::memory::MemoryStore;
use planboard_core::storage::{BoardStore, StoreError};
use planboard_core::wire::{ChatRequest, ColumnUpdate, LabelsBody, TaskUpdate};
use serde::de::DeserializeOwned;
use serde::Deserialize;

pub const API_PREFIX: &str = "/api/v1";

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: &'static str,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub enum ChatMode {
    Json(serde_json::Value),
    Stream(Vec<String>),
    Fail(u16),
}

pub struct MockState {
    pub store: MemoryStore,
    requests: Mutex<Vec<RecordedRequest>>,
    chat: Mutex<ChatMode>,
    chat_requests: Mutex<Vec<ChatRequest>>,
}

impl MockState {
    fn record(&self, method: &'static str, path: String, body: Option<serde_json::Value>) {
        self.requests
            .lock()
            .unwrap()
            .push(RecordedRequest { method, path, body });
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Recorded requests excluding GETs.
    pub fn writes(&self) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method != "GET")
            .collect()
    }

    pub fn clear_requests(&self) {
        self.requests.lock().unwrap().clear();
    }

    pub fn set_chat(&self, mode: ChatMode) {
        *self.chat.lock().unwrap() = mode;
    }

    pub fn chat_requests(&self) -> Vec<ChatRequest> {
        self.chat_requests.lock().unwrap().clone()
    }
}

pub struct MockServer {
    pub state: Arc<MockState>,
    pub base_url: String,
}

type Shared = State<Arc<MockState>>;

fn status_of(err: StoreError) -> StatusCode {
    match err {
        StoreError::Status { status, .. } => {
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn json_or_status<T: serde::Serialize>(result: Result<T, StoreError>) -> Response {
    match result {
        Ok(value) => Json(value).into_response(),
        Err(e) => (status_of(e), Json(serde_json::json!({ "detail": "error" }))).into_response(),
    }
}

fn empty_or_status(result: Result<(), StoreError>) -> Response {
    match result {
        Ok(()) => Json(serde_json::json!({ "message": "ok" })).into_response(),
        Err(e) => status_of(e).into_response(),
    }
}

/// Record the body as it came over the wire, then decode it.
fn take_body<T: DeserializeOwned>(
    state: &MockState,
    method: &'static str,
    path: String,
    raw: &Bytes,
) -> Result<T, Response> {
    state.record(method, path, serde_json::from_slice(raw).ok());
    serde_json::from_slice(raw).map_err(|_| StatusCode::UNPROCESSABLE_ENTITY.into_response())
}

#[derive(Deserialize)]
struct TasksQuery {
    column_id: Option<u64>,
}

async fn list_columns(State(state): Shared) -> Response {
    state.record("GET", "/columns".to_string(), None);
    json_or_status(state.store.list_columns().await)
}

async fn create_column(State(state): Shared, raw: Bytes) -> Response {
    match take_body::<ColumnUpdate>(&state, "POST", "/columns".to_string(), &raw) {
        Ok(body) => json_or_status(state.store.create_column(body).await),
        Err(rejected) => rejected,
    }
}

async fn update_column(State(state): Shared, Path(id): Path<u64>, raw: Bytes) -> Response {
    match take_body::<ColumnUpdate>(&state, "PUT", format!("/columns/{}", id), &raw) {
        Ok(body) => json_or_status(state.store.update_column(id, body).await),
        Err(rejected) => rejected,
    }
}

async fn delete_column(State(state): Shared, Path(id): Path<u64>) -> Response {
    state.record("DELETE", format!("/columns/{}", id), None);
    empty_or_status(state.store.delete_column(id).await)
}

async fn list_tasks(State(state): Shared, Query(query): Query<TasksQuery>) -> Response {
    let column_id = query.column_id.unwrap_or_default();
    state.record("GET", format!("/tasks?column_id={}", column_id), None);
    json_or_status(state.store.list_tasks(column_id).await)
}

async fn create_task(State(state): Shared, raw: Bytes) -> Response {
    match take_body::<TaskUpdate>(&state, "POST", "/tasks".to_string(), &raw) {
        Ok(body) => json_or_status(state.store.create_task(body).await),
        Err(rejected) => rejected,
    }
}

async fn update_task(State(state): Shared, Path(id): Path<u64>, raw: Bytes) -> Response {
    match take_body::<TaskUpdate>(&state, "PUT", format!("/tasks/{}", id), &raw) {
        Ok(body) => json_or_status(state.store.update_task(id, body).await),
        Err(rejected) => rejected,
    }
}

async fn delete_task(State(state): Shared, Path(id): Path<u64>) -> Response {
    state.record("DELETE", format!("/tasks/{}", id), None);
    empty_or_status(state.store.delete_task(id).await)
}

async fn task_labels(State(state): Shared, Path(id): Path<u64>) -> Response {
    state.record("GET", format!("/tasks/{}/labels", id), None);
    json_or_status(state.store.task_labels(id).await)
}

async fn replace_task_labels(State(state): Shared, Path(id): Path<u64>, raw: Bytes) -> Response {
    match take_body::<LabelsBody>(&state, "POST", format!("/tasks/{}/labels", id), &raw) {
        Ok(body) => empty_or_status(state.store.replace_task_labels(id, body.labels).await),
        Err(rejected) => rejected,
    }
}

async fn chat(State(state): Shared, Json(body): Json<ChatRequest>) -> Response {
    state.chat_requests.lock().unwrap().push(body);
    let mode = state.chat.lock().unwrap().clone();
    match mode {
        ChatMode::Json(value) => Json(value).into_response(),
        ChatMode::Stream(frames) => {
            let body: String = frames
                .iter()
                .map(|frame| format!("data: {}\n\n", frame))
                .collect();
            ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
        }
        ChatMode::Fail(status) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            Json(serde_json::json!({ "detail": "upstream failure" })),
        )
            .into_response(),
    }
}

fn router(state: Arc<MockState>) -> Router {
    let api = Router::new()
        .route("/columns", get(list_columns).post(create_column))
        .route("/columns/{id}", put(update_column).delete(delete_column))
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/{id}", put(update_task).delete(delete_task))
        .route("/tasks/{id}/labels", get(task_labels).post(replace_task_labels))
        .route("/chat", post(chat));
    Router::new().nest(API_PREFIX, api).with_state(state)
}

/// Serve `store` on an ephemeral localhost port.
pub async fn spawn_mock(store: MemoryStore) -> MockServer {
    let state = Arc::new(MockState {
        store,
        requests: Mutex::new(Vec::new()),
        chat: Mutex::new(ChatMode::Json(serde_json::json!({
            "status": "success",
            "message": "ok"
        }))),
        chat_requests: Mutex::new(Vec::new()),
    });
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    MockServer {
        state,
        base_url: format!("http://{}{}", addr, API_PREFIX),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_body_as_sent() {
        let store = MemoryStore::new();
        let col = store.seed_column("A", 0);
        let task = store.seed_task(col, "t", None, false);
        let mock = spawn_mock(store).await;

        let raw = r#"{"title":"t","order":null,"completed":true,"extra":1}"#;
        let response = reqwest::Client::new()
            .put(format!("{}/tasks/{}", mock.base_url, task))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(raw)
            .send()
            .await
            .unwrap();
        assert!(response.status().is_success());

        let sent = mock.state.writes()[0].body.clone().unwrap();
        assert_eq!(sent, serde_json::from_str::<serde_json::Value>(raw).unwrap());
        assert!(mock.state.store.task(task).unwrap().completed);
    }

    #[tokio::test]
    async fn test_undecodable_body_is_recorded_and_rejected() {
        let mock = spawn_mock(MemoryStore::new()).await;
        let response = reqwest::Client::new()
            .post(format!("{}/columns", mock.base_url))
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(r#"{"order":2}"#)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 422);
        let recorded = mock.state.writes();
        assert_eq!(recorded[0].body, Some(serde_json::json!({ "order": 2 })));
        assert!(mock.state.store.journal().is_empty());
    }
}
